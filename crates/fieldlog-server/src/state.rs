use fieldlog_core::{AccountService, FieldLogService, TokenIssuer};

use crate::backend::Backend;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub logs: FieldLogService,
    pub accounts: AccountService,
}

impl AppState {
    pub fn new(backend: &Backend, tokens: TokenIssuer) -> Self {
        Self {
            logs: FieldLogService::new(backend.store(), backend.blobs()),
            accounts: AccountService::new(
                backend.store(),
                backend.blobs(),
                backend.identity(),
                tokens,
            ),
        }
    }
}
