use serde::{Deserialize, Serialize};

/// Bind a unique name to the sending address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterName {
    pub name: String,
}
