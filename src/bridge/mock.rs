//! In-memory foreign engine used by the bridge tests.

use std::cell::RefCell;
use std::rc::Rc;

use bytes::Bytes;

use super::foreign::ForeignEngine;
use crate::engine::{ArenaKey, EndpointState, StateMask};
use crate::protocol::{ErrorCondition, TerminusType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLinkHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTerminusHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDeliveryHandle(pub usize);

#[derive(Debug, Default, Clone)]
pub struct MockTerminus {
    pub kind: TerminusType,
    pub address: Option<String>,
    pub dynamic: bool,
    pub durability: Option<u32>,
    pub expiry: Option<String>,
    pub timeout: Option<u32>,
    pub capabilities: Vec<String>,
}

#[derive(Debug)]
pub struct MockLink {
    pub name: String,
    pub sender: bool,
    pub local: EndpointState,
    pub remote: EndpointState,
    pub context: Option<ArenaKey>,
    pub source: MockTerminusHandle,
    pub target: MockTerminusHandle,
    pub remote_source: MockTerminusHandle,
    pub remote_target: MockTerminusHandle,
    pub credit: u32,
    pub queued: u32,
    pub unsettled: u32,
    pub offered: u32,
    pub remote_error: Option<ErrorCondition>,
    pub deliveries: Vec<MockDeliveryHandle>,
    pub cursor: usize,
    pub freed: bool,
}

#[derive(Debug, Default)]
pub struct MockEngine {
    pub links: Vec<MockLink>,
    pub termini: Vec<MockTerminus>,
    pub tags: Vec<Bytes>,
    pub free_calls: usize,
    /// Shared so frees stay observable after the owning bridge is dropped.
    pub released: Rc<RefCell<Vec<MockLinkHandle>>>,
}

impl MockEngine {
    fn terminus(&mut self) -> MockTerminusHandle {
        self.termini.push(MockTerminus::default());
        MockTerminusHandle(self.termini.len() - 1)
    }

    pub fn add_link(&mut self, name: &str, sender: bool) -> MockLinkHandle {
        let source = self.terminus();
        let target = self.terminus();
        let remote_source = self.terminus();
        let remote_target = self.terminus();
        self.links.push(MockLink {
            name: name.to_owned(),
            sender,
            local: EndpointState::Uninitialized,
            remote: EndpointState::Uninitialized,
            context: None,
            source,
            target,
            remote_source,
            remote_target,
            credit: 0,
            queued: 0,
            unsettled: 0,
            offered: 0,
            remote_error: None,
            deliveries: Vec::new(),
            cursor: 0,
            freed: false,
        });
        MockLinkHandle(self.links.len() - 1)
    }

    pub fn link_ref(&self, link: MockLinkHandle) -> &MockLink {
        &self.links[link.0]
    }

    pub fn link_ref_mut(&mut self, link: MockLinkHandle) -> &mut MockLink {
        &mut self.links[link.0]
    }

    pub fn terminus_ref(&self, terminus: MockTerminusHandle) -> &MockTerminus {
        &self.termini[terminus.0]
    }

    pub fn terminus_ref_mut(&mut self, terminus: MockTerminusHandle) -> &mut MockTerminus {
        &mut self.termini[terminus.0]
    }

    fn live(&self, link: MockLinkHandle) -> &MockLink {
        let l = &self.links[link.0];
        assert!(!l.freed, "use of freed link {link:?}");
        l
    }

    fn live_mut(&mut self, link: MockLinkHandle) -> &mut MockLink {
        let l = &mut self.links[link.0];
        assert!(!l.freed, "use of freed link {link:?}");
        l
    }
}

impl ForeignEngine for MockEngine {
    type Link = MockLinkHandle;
    type Terminus = MockTerminusHandle;
    type Delivery = MockDeliveryHandle;

    fn link_context(&self, link: MockLinkHandle) -> Option<ArenaKey> {
        self.live(link).context
    }

    fn set_link_context(&mut self, link: MockLinkHandle, context: Option<ArenaKey>) {
        self.live_mut(link).context = context;
    }

    fn link_is_sender(&self, link: MockLinkHandle) -> bool {
        self.live(link).sender
    }

    fn link_is_receiver(&self, link: MockLinkHandle) -> bool {
        !self.live(link).sender
    }

    fn link_name(&self, link: MockLinkHandle) -> String {
        self.live(link).name.clone()
    }

    fn link_state(&self, link: MockLinkHandle) -> (EndpointState, EndpointState) {
        let l = self.live(link);
        (l.local, l.remote)
    }

    fn link_open(&mut self, link: MockLinkHandle) {
        let l = self.live_mut(link);
        if l.local == EndpointState::Uninitialized {
            l.local = EndpointState::Active;
        }
    }

    fn link_close(&mut self, link: MockLinkHandle) {
        self.live_mut(link).local = EndpointState::Closed;
    }

    fn link_free(&mut self, link: MockLinkHandle) {
        self.free_calls += 1;
        self.released.borrow_mut().push(link);
        self.live_mut(link).freed = true;
    }

    fn link_next(
        &self,
        link: MockLinkHandle,
        local: StateMask,
        remote: StateMask,
    ) -> Option<MockLinkHandle> {
        self.links
            .iter()
            .enumerate()
            .skip(link.0 + 1)
            .find(|(_, l)| !l.freed && local.contains(l.local) && remote.contains(l.remote))
            .map(|(i, _)| MockLinkHandle(i))
    }

    fn link_remote_error(&self, link: MockLinkHandle) -> Option<ErrorCondition> {
        self.live(link).remote_error.clone()
    }

    fn link_source(&self, link: MockLinkHandle) -> Option<MockTerminusHandle> {
        Some(self.live(link).source)
    }

    fn link_target(&self, link: MockLinkHandle) -> Option<MockTerminusHandle> {
        Some(self.live(link).target)
    }

    fn link_remote_source(&self, link: MockLinkHandle) -> Option<MockTerminusHandle> {
        Some(self.live(link).remote_source)
    }

    fn link_remote_target(&self, link: MockLinkHandle) -> Option<MockTerminusHandle> {
        Some(self.live(link).remote_target)
    }

    fn link_credit(&self, link: MockLinkHandle) -> u32 {
        self.live(link).credit
    }

    fn link_queued(&self, link: MockLinkHandle) -> u32 {
        self.live(link).queued
    }

    fn link_unsettled(&self, link: MockLinkHandle) -> u32 {
        self.live(link).unsettled
    }

    fn link_flow(&mut self, link: MockLinkHandle, credit: u32) {
        let l = self.live_mut(link);
        l.credit = l.credit.saturating_add(credit);
    }

    fn link_offered(&mut self, link: MockLinkHandle, available: u32) {
        self.live_mut(link).offered = available;
    }

    fn delivery(&mut self, link: MockLinkHandle, tag: Bytes) -> Option<MockDeliveryHandle> {
        let in_use = self
            .live(link)
            .deliveries
            .iter()
            .any(|d| self.tags[d.0] == tag);
        if in_use {
            return None;
        }
        self.tags.push(tag);
        let handle = MockDeliveryHandle(self.tags.len() - 1);
        self.live_mut(link).deliveries.push(handle);
        Some(handle)
    }

    fn link_current(&self, link: MockLinkHandle) -> Option<MockDeliveryHandle> {
        let l = self.live(link);
        l.deliveries.get(l.cursor).copied()
    }

    fn link_advance(&mut self, link: MockLinkHandle) -> bool {
        let l = self.live_mut(link);
        if l.cursor < l.deliveries.len() {
            l.cursor += 1;
            true
        } else {
            false
        }
    }

    fn terminus_type(&self, terminus: MockTerminusHandle) -> TerminusType {
        self.terminus_ref(terminus).kind
    }

    fn set_terminus_type(&mut self, terminus: MockTerminusHandle, kind: TerminusType) {
        self.terminus_ref_mut(terminus).kind = kind;
    }

    fn terminus_address(&self, terminus: MockTerminusHandle) -> Option<String> {
        self.terminus_ref(terminus).address.clone()
    }

    fn set_terminus_address(&mut self, terminus: MockTerminusHandle, address: Option<&str>) {
        self.terminus_ref_mut(terminus).address = address.map(str::to_owned);
    }

    fn terminus_is_dynamic(&self, terminus: MockTerminusHandle) -> bool {
        self.terminus_ref(terminus).dynamic
    }

    fn set_terminus_dynamic(&mut self, terminus: MockTerminusHandle, dynamic: bool) {
        self.terminus_ref_mut(terminus).dynamic = dynamic;
    }

    fn terminus_durability(&self, terminus: MockTerminusHandle) -> Option<u32> {
        self.terminus_ref(terminus).durability
    }

    fn set_terminus_durability(&mut self, terminus: MockTerminusHandle, code: u32) {
        self.terminus_ref_mut(terminus).durability = Some(code);
    }

    fn terminus_expiry_policy(&self, terminus: MockTerminusHandle) -> Option<&str> {
        self.terminus_ref(terminus).expiry.as_deref()
    }

    fn set_terminus_expiry_policy(&mut self, terminus: MockTerminusHandle, symbol: &'static str) {
        self.terminus_ref_mut(terminus).expiry = Some(symbol.to_owned());
    }

    fn terminus_timeout(&self, terminus: MockTerminusHandle) -> Option<u32> {
        self.terminus_ref(terminus).timeout
    }

    fn set_terminus_timeout(&mut self, terminus: MockTerminusHandle, seconds: u32) {
        self.terminus_ref_mut(terminus).timeout = Some(seconds);
    }

    fn terminus_capabilities(&self, terminus: MockTerminusHandle) -> Vec<String> {
        self.terminus_ref(terminus).capabilities.clone()
    }

    fn set_terminus_capabilities(&mut self, terminus: MockTerminusHandle, capabilities: &[String]) {
        self.terminus_ref_mut(terminus).capabilities = capabilities.to_vec();
    }
}
