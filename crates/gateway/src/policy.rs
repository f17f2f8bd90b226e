// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Role-based access table enforced with casbin.
//!
//! The model (`model.conf`) matches `(role, path, method)` requests against
//! `p, <role>, <path>, <method>` rules, with `keyMatch` on the path and `*`
//! standing for any method. Anything no rule allows is denied.

use std::path::Path;

use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi};
use snafu::{ResultExt, ensure};

use crate::error::{EnforcerSnafu, InvalidPolicySnafu, ReadPolicySnafu, Result};

/// Casbin model shared by every policy table.
pub const MODEL: &str = include_str!("../model.conf");

/// Built-in table used when no policy file is configured.
pub const DEFAULT_POLICY: &str = include_str!("../policy.csv");

pub struct Policy {
    enforcer: Enforcer,
}

impl std::fmt::Debug for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Policy").field("rules", &self.len()).finish()
    }
}

impl Policy {
    /// Builds an enforcer over a CSV policy table. Blank lines and `#`
    /// comments are skipped.
    pub async fn from_csv(source: &str) -> Result<Self> {
        let model = DefaultModel::from_str(MODEL).await.context(EnforcerSnafu)?;
        let mut enforcer = Enforcer::new(model, MemoryAdapter::default())
            .await
            .context(EnforcerSnafu)?;
        let rules = rules(source)?;
        if !rules.is_empty() {
            enforcer.add_policies(rules).await.context(EnforcerSnafu)?;
        }
        Ok(Self { enforcer })
    }

    /// Reads the table from `path`, or falls back to [`DEFAULT_POLICY`].
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Self::from_csv(DEFAULT_POLICY).await,
            Some(path) => {
                let source = tokio::fs::read_to_string(path)
                    .await
                    .context(ReadPolicySnafu {
                        path: path.display().to_string(),
                    })?;
                Self::from_csv(&source).await
            }
        }
    }

    pub fn allows(&self, role: &str, path: &str, method: &str) -> Result<bool> {
        self.enforcer
            .enforce((role, path, method))
            .context(EnforcerSnafu)
    }

    pub fn len(&self) -> usize { self.enforcer.get_policy().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Splits `p, <role>, <path>, <method>` lines into casbin policy rows.
fn rules(source: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        ensure!(fields.len() == 4, InvalidPolicySnafu {
            line:   index + 1,
            reason: format!("expected 4 fields, found {}", fields.len()),
        });
        ensure!(fields[0] == "p", InvalidPolicySnafu {
            line:   index + 1,
            reason: format!("unknown rule type {:?}", fields[0]),
        });
        ensure!(
            fields[1..].iter().all(|f| !f.is_empty()),
            InvalidPolicySnafu {
                line:   index + 1,
                reason: "empty field".to_string(),
            }
        );
        rows.push(fields[1..].iter().map(ToString::to_string).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn builtin() -> Policy { Policy::load(None).await.unwrap() }

    #[tokio::test]
    async fn test_admin_is_allowed_everywhere() {
        let policy = builtin().await;
        assert!(policy.allows("admin", "/auth/delete-profile/42", "DELETE").unwrap());
        assert!(policy.allows("admin", "/payment/delete-payment/1", "DELETE").unwrap());
    }

    #[tokio::test]
    async fn test_user_rules() {
        let policy = builtin().await;
        assert!(policy.allows("user", "/booking/create-booking", "POST").unwrap());
        assert!(policy.allows("user", "/booking/abc", "DELETE").unwrap());
        assert!(policy.allows("user", "/service/list-service", "GET").unwrap());
        assert!(policy.allows("user", "/review/update-review", "PUT").unwrap());
        assert!(!policy.allows("user", "/service/create-service", "POST").unwrap());
        assert!(!policy.allows("user", "/auth/delete-profile/1", "DELETE").unwrap());
        assert!(!policy.allows("user", "/payment/update-payment", "PUT").unwrap());
    }

    #[tokio::test]
    async fn test_provider_rules() {
        let policy = builtin().await;
        assert!(policy.allows("provider", "/service/create-service", "POST").unwrap());
        assert!(policy.allows("provider", "/provider/abc", "DELETE").unwrap());
        assert!(!policy.allows("provider", "/booking/create-booking", "POST").unwrap());
        assert!(!policy.allows("provider", "/review/create-review", "POST").unwrap());
    }

    #[tokio::test]
    async fn test_unknown_role_is_denied() {
        let policy = builtin().await;
        assert!(!policy.allows("guest", "/service/list-service", "GET").unwrap());
        assert!(!policy.allows("", "/auth/profiles", "GET").unwrap());
    }

    #[tokio::test]
    async fn test_key_match_does_not_cover_parent() {
        let policy = Policy::from_csv("p, user, /auth/*, GET").await.unwrap();
        assert!(policy.allows("user", "/auth/profiles", "GET").unwrap());
        assert!(!policy.allows("user", "/auth", "GET").unwrap());
        assert!(!policy.allows("user", "/authx/profiles", "GET").unwrap());
        assert!(!policy.allows("user", "/auth/profiles", "POST").unwrap());
    }

    #[tokio::test]
    async fn test_malformed_lines() {
        assert!(Policy::from_csv("p, user, /auth/*").await.is_err());
        assert!(Policy::from_csv("g, user, admin, *").await.is_err());
        assert!(Policy::from_csv("p, user, , GET").await.is_err());
        let policy = Policy::from_csv("# comment\n\n  p, user, /x, GET  \n")
            .await
            .unwrap();
        assert_eq!(policy.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_table_denies_everything() {
        let policy = Policy::from_csv("# nothing\n").await.unwrap();
        assert!(policy.is_empty());
        assert!(!policy.allows("admin", "/auth/profiles", "GET").unwrap());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = Policy::load(Some(Path::new("/nonexistent/policy.csv")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/policy.csv"));
    }
}
