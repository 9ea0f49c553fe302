use crate::model::Id;
use serde::{Deserialize, Serialize};

/// Who is submitting a job and in which workspace, used to decide which
/// resources a submission may reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Id,
    pub workspace_id: Id,
}

impl UserContext {
    pub fn new(user_id: impl Into<Id>, workspace_id: impl Into<Id>) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_id: workspace_id.into(),
        }
    }
}
