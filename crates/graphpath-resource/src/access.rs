//! Signature-based access control
//!
//! Rules are keyed by resource signature. Reads are GET, HEAD and OPTIONS;
//! writes are POST, PUT and DELETE.

use crate::context::Principal;
use crate::resource::Verb;
use graphpath_core::{AccessRule, GraphPathError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Access rules indexed by signature
#[derive(Debug, Clone, Default)]
pub struct AccessRules {
    rules: HashMap<String, AccessRule>,
}

impl AccessRules {
    pub fn from_config(rules: &[AccessRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|rule| (rule.signature.clone(), rule.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule(&self, signature: &str) -> Option<&AccessRule> {
        self.rules.get(signature)
    }

    /// Whether `principal` may apply `verb` to the resource at `signature`
    pub fn allows(&self, signature: &str, principal: Option<&Principal>, verb: Verb) -> bool {
        let write = verb.is_write();
        let Some(rule) = self.rules.get(signature) else {
            return !write && principal.is_some();
        };

        let (public, authenticated) = if write {
            (rule.public_write, rule.authenticated_write)
        } else {
            (rule.public_read, rule.authenticated_read)
        };
        if public {
            return true;
        }

        match principal {
            Some(principal) if authenticated => {
                rule.roles.is_empty() || rule.roles.iter().any(|role| principal.has_role(role))
            }
            _ => false,
        }
    }

    /// Like [`allows`](Self::allows), failing with `NotAllowed`
    pub fn check(&self, signature: &str, principal: Option<&Principal>, verb: Verb) -> Result<()> {
        if self.allows(signature, principal, verb) {
            return Ok(());
        }
        debug!(
            signature,
            verb = %verb,
            subject = principal.map(|p| p.subject.as_str()),
            "Access denied"
        );
        let who = principal.map_or("anonymous callers".to_string(), |p| p.subject.clone());
        Err(GraphPathError::NotAllowed {
            reason: format!("{verb} on '{signature}' is not allowed for {who}"),
        })
    }
}
