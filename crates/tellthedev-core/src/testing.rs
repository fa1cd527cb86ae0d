use std::cell::RefCell;
use std::collections::VecDeque;

use async_trait::async_trait;

use crate::transport::{TransportError, WidgetRequest, WidgetResponse, WidgetTransport};

#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    queued: RefCell<VecDeque<Result<WidgetResponse, TransportError>>>,
    seen: RefCell<Vec<WidgetRequest>>,
}

impl FakeTransport {
    pub(crate) fn with_result(result: Result<WidgetResponse, TransportError>) -> Self {
        let transport = Self::default();
        transport.queued.borrow_mut().push_back(result);
        transport
    }

    pub(crate) fn replying(response: WidgetResponse) -> Self {
        Self::with_result(Ok(response))
    }

    pub(crate) fn requests(&self) -> Vec<WidgetRequest> {
        self.seen.borrow().clone()
    }
}

#[async_trait(?Send)]
impl WidgetTransport for FakeTransport {
    async fn send(&self, request: WidgetRequest) -> Result<WidgetResponse, TransportError> {
        self.seen.borrow_mut().push(request);
        self.queued
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no response queued".to_string())))
    }
}
