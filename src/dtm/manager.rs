//! DTM registry
//!
//! A [`DtmManager`] hands each document it adopts a distinct id, so handles
//! from every document it owns live in one ordered space. Handle-based calls
//! are routed to the owning DTM by the id in the handle's high bits.

use tracing::debug;

use super::document::Dtm;
use super::navigator::Navigator;
use super::{NodeHandle, NodeType, MAX_DTM_ID};
use crate::error::DtmError;

#[derive(Debug, Default)]
pub struct DtmManager {
    dtms: Vec<Dtm>,
}

impl DtmManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a document and return the id its handles now carry
    pub fn add(&mut self, mut dtm: Dtm) -> Result<u16, DtmError> {
        let id = self.dtms.len();
        if id > MAX_DTM_ID as usize {
            return Err(DtmError::CapacityExceeded {
                limit: MAX_DTM_ID as usize + 1,
            });
        }
        let id = id as u16;
        dtm.set_id(id);
        debug!(dtm = id, nodes = dtm.node_count(), "dtm registered");
        self.dtms.push(dtm);
        Ok(id)
    }

    pub fn get(&self, id: u16) -> Option<&Dtm> {
        self.dtms.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut Dtm> {
        self.dtms.get_mut(id as usize)
    }

    /// Document owning `node`
    pub fn owner(&self, node: NodeHandle) -> Option<&Dtm> {
        self.get(node.dtm_id())
    }

    pub fn len(&self) -> usize {
        self.dtms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dtms.is_empty()
    }

    /// All documents, for batch work such as parallel evaluation
    pub fn as_mut_slice(&mut self) -> &mut [Dtm] {
        &mut self.dtms
    }

    fn route(&self, node: NodeHandle) -> &Dtm {
        match self.dtms.get(node.dtm_id() as usize) {
            Some(dtm) => dtm,
            None => panic!("{node:?} does not belong to any managed dtm"),
        }
    }

    fn route_mut(&mut self, node: NodeHandle) -> Result<&mut Dtm, DtmError> {
        self.dtms
            .get_mut(node.dtm_id() as usize)
            .ok_or(DtmError::ForeignHandle(node.raw()))
    }
}

impl Navigator for DtmManager {
    fn first_child(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
        self.route_mut(node)?.first_child(node)
    }

    fn next_sibling(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
        self.route_mut(node)?.next_sibling(node)
    }

    fn node_after(&mut self, node: NodeHandle) -> Result<Option<NodeHandle>, DtmError> {
        self.route_mut(node)?.node_after(node)
    }

    fn string_value(&mut self, node: NodeHandle) -> Result<String, DtmError> {
        self.route_mut(node)?.string_value(node)
    }

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.route(node).parent(node)
    }

    fn previous_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.route(node).previous_sibling(node)
    }

    fn node_before(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.route(node).node_before(node)
    }

    fn node_type(&self, node: NodeHandle) -> NodeType {
        self.route(node).node_type(node)
    }

    fn level(&self, node: NodeHandle) -> u16 {
        self.route(node).level(node)
    }

    fn expanded_type(&self, node: NodeHandle) -> u32 {
        self.route(node).expanded_type(node)
    }

    fn local_name(&self, node: NodeHandle) -> &str {
        self.route(node).local_name(node)
    }

    fn namespace_uri(&self, node: NodeHandle) -> &str {
        self.route(node).namespace_uri(node)
    }

    fn node_name(&self, node: NodeHandle) -> &str {
        self.route(node).node_name(node)
    }

    fn node_value(&self, node: NodeHandle) -> &str {
        self.route(node).node_value(node)
    }
}
