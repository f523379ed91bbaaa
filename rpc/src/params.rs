//! Positional parameter access.

use std::str::FromStr;

use agora_types::{BillId, KeyId};
use serde_json::Value;

use crate::error::RpcError;

/// The positional `params` array of one request.
pub struct Params<'a> {
    values: &'a [Value],
}

impl<'a> Params<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    pub fn str(&self, index: usize, name: &str) -> Result<&'a str, RpcError> {
        self.opt_str(index, name)?
            .ok_or_else(|| RpcError::InvalidParams(format!("missing {name}")))
    }

    pub fn opt_str(&self, index: usize, name: &str) -> Result<Option<&'a str>, RpcError> {
        match self.get(index) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(RpcError::InvalidParams(format!("{name} must be a string"))),
        }
    }

    pub fn key(&self, index: usize, name: &str) -> Result<KeyId, RpcError> {
        parse_key(self.str(index, name)?)
    }

    pub fn opt_key(&self, index: usize, name: &str) -> Result<Option<KeyId>, RpcError> {
        self.opt_str(index, name)?.map(parse_key).transpose()
    }

    pub fn bill(&self, index: usize) -> Result<BillId, RpcError> {
        let raw = self.str(index, "bill id")?;
        BillId::from_str(raw).map_err(|e| RpcError::InvalidAddress(e.to_string()))
    }

    /// A non-negative integer given as a JSON number or a decimal string.
    pub fn u64(&self, index: usize, name: &str) -> Result<u64, RpcError> {
        self.opt_u64(index, name)?
            .ok_or_else(|| RpcError::InvalidParams(format!("missing {name}")))
    }

    pub fn opt_u64(&self, index: usize, name: &str) -> Result<Option<u64>, RpcError> {
        let invalid = || RpcError::InvalidParams(format!("{name} must be a non-negative integer"));
        match self.get(index) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(invalid),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }

    /// A decimal amount, kept as text so it can be parsed at the token's
    /// precision.
    pub fn amount(&self, index: usize, name: &str) -> Result<String, RpcError> {
        match self.get(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(_) => Err(RpcError::InvalidParams(format!("{name} must be a decimal amount"))),
            None => Err(RpcError::InvalidParams(format!("missing {name}"))),
        }
    }

    /// Every value from `index` on. A single array in that position is
    /// flattened.
    fn rest(&self, index: usize) -> &'a [Value] {
        let tail = self.values.get(index..).unwrap_or(&[]);
        match tail {
            [Value::Array(items)] => items.as_slice(),
            _ => tail,
        }
    }

    pub fn rest_strings(&self, index: usize, name: &str) -> Result<Vec<String>, RpcError> {
        self.rest(index)
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(RpcError::InvalidParams(format!("{name} must be strings"))),
            })
            .collect()
    }

    pub fn rest_u64(&self, index: usize, name: &str) -> Result<Vec<u64>, RpcError> {
        let items = self.rest(index);
        let all = Params::new(items);
        (0..items.len()).map(|i| all.u64(i, name)).collect()
    }
}

fn parse_key(raw: &str) -> Result<KeyId, RpcError> {
    KeyId::from_str(raw).map_err(|e| RpcError::InvalidAddress(e.to_string()))
}
