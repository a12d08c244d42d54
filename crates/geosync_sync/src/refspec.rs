//! Refspec parsing and resolution.
//!
//! A push names what to send as `source[:destination]`. Resolution turns
//! the user's arguments into concrete `(local ref, remote ref)` pairs and
//! picks the remote to push to. It reads the local ref store and the
//! repository config, and has no side effects.

use crate::error::{SyncError, SyncResult};
use geosync_store::{
    branch_name, validate_ref_name, RefStore, RepoConfig, DEFAULT_REMOTE, HEAD, HEADS_PREFIX,
    REFS_PREFIX, TAGS_PREFIX,
};
use std::collections::HashSet;
use std::fmt;

/// A refspec as written by the user, not yet resolved against any store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpec {
    /// The local side.
    pub source: String,
    /// The remote side; `None` means the same name as the source.
    pub destination: Option<String>,
}

impl RefSpec {
    /// Parses `source[:destination]`.
    ///
    /// The delete form `:destination`, an empty source, more than one `:`
    /// and the force prefix `+` are all rejected.
    pub fn parse(spec: &str) -> SyncResult<Self> {
        let trimmed = spec.trim();
        if trimmed.starts_with('+') {
            return Err(SyncError::invalid_refspec(
                spec,
                "forced updates are not supported",
            ));
        }

        let mut parts = trimmed.split(':');
        let source = parts.next().unwrap_or_default();
        let destination = parts.next();
        if parts.next().is_some() {
            return Err(SyncError::invalid_refspec(spec, "more than one ':'"));
        }
        if source.is_empty() {
            let reason = if destination.is_some() {
                "deleting remote refs is not supported"
            } else {
                "empty source"
            };
            return Err(SyncError::invalid_refspec(spec, reason));
        }

        let destination = match destination {
            Some("") => return Err(SyncError::invalid_refspec(spec, "empty destination")),
            Some(dst) => Some(dst.to_string()),
            None => None,
        };

        Ok(Self {
            source: source.to_string(),
            destination,
        })
    }
}

/// A refspec resolved to full ref names on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedRefSpec {
    /// Full name of the local ref.
    pub local_ref: String,
    /// Full name of the remote ref.
    pub remote_ref: String,
}

impl ResolvedRefSpec {
    /// Creates a resolved refspec.
    pub fn new(local_ref: impl Into<String>, remote_ref: impl Into<String>) -> Self {
        Self {
            local_ref: local_ref.into(),
            remote_ref: remote_ref.into(),
        }
    }
}

impl fmt::Display for ResolvedRefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.local_ref, self.remote_ref)
    }
}

/// The outcome of resolution: which remote, and which refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    /// Name of the remote.
    pub remote: String,
    /// Refs to push, in argument order.
    pub refspecs: Vec<ResolvedRefSpec>,
}

/// Resolves push arguments against a local ref store and config.
pub struct RefSpecResolver<'a> {
    refs: &'a dyn RefStore,
    config: &'a RepoConfig,
}

impl<'a> RefSpecResolver<'a> {
    /// Creates a resolver.
    pub fn new(refs: &'a dyn RefStore, config: &'a RepoConfig) -> Self {
        Self { refs, config }
    }

    /// Resolves the remote and the refspec list.
    ///
    /// With `all`, every local branch is pushed to the same name and
    /// `specs` is ignored. With explicit `specs`, each is parsed and
    /// expanded. With neither, the current branch is pushed to its
    /// configured upstream.
    ///
    /// The remote is `remote` if given, else the current branch's upstream
    /// remote, else `origin`. Whether the remote exists is checked when
    /// connecting.
    pub fn resolve(
        &self,
        remote: Option<&str>,
        specs: &[String],
        all: bool,
    ) -> SyncResult<PushTarget> {
        let refspecs = if all {
            self.all_branches()?
        } else if !specs.is_empty() {
            specs
                .iter()
                .map(|spec| self.resolve_spec(spec))
                .collect::<SyncResult<Vec<_>>>()?
        } else {
            vec![self.upstream_spec()?]
        };

        check_unique_destinations(&refspecs)?;

        let remote = match remote {
            Some(name) => name.to_string(),
            None => self
                .current_upstream()?
                .map(|(_, remote, _)| remote)
                .unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
        };

        Ok(PushTarget { remote, refspecs })
    }

    /// Resolves a single `source[:destination]` string.
    pub fn resolve_spec(&self, spec: &str) -> SyncResult<ResolvedRefSpec> {
        let parsed = RefSpec::parse(spec)?;
        let local_ref = self.expand_source(spec, &parsed.source)?;

        let remote_ref = match parsed.destination {
            None => local_ref.clone(),
            Some(dst) if dst == HEAD || dst.starts_with(REFS_PREFIX) => dst,
            Some(dst) => format!("{}{}", destination_namespace(&local_ref), dst),
        };
        validate_ref_name(&remote_ref)
            .map_err(|e| SyncError::invalid_refspec(spec, e.to_string()))?;

        Ok(ResolvedRefSpec {
            local_ref,
            remote_ref,
        })
    }

    fn expand_source(&self, spec: &str, source: &str) -> SyncResult<String> {
        if source == HEAD {
            return match self.refs.current_branch()? {
                Some(branch) if self.refs.peel(&branch)?.is_some() => Ok(branch),
                Some(branch) => Err(SyncError::invalid_refspec(
                    spec,
                    format!("{} does not point at a commit", branch),
                )),
                None => Err(SyncError::invalid_refspec(spec, "HEAD is detached")),
            };
        }

        let candidates = if source.starts_with(REFS_PREFIX) {
            vec![source.to_string()]
        } else {
            vec![
                format!("{}{}", HEADS_PREFIX, source),
                format!("{}{}", TAGS_PREFIX, source),
                format!("{}{}", REFS_PREFIX, source),
            ]
        };

        for candidate in candidates {
            if validate_ref_name(&candidate).is_err() {
                continue;
            }
            if self.refs.peel(&candidate)?.is_some() {
                return Ok(candidate);
            }
        }
        Err(SyncError::invalid_refspec(
            spec,
            format!("{} does not match any local ref", source),
        ))
    }

    fn all_branches(&self) -> SyncResult<Vec<ResolvedRefSpec>> {
        let mut refspecs = Vec::new();
        for (name, target) in self.refs.list(HEADS_PREFIX)? {
            if target.is_symbolic() {
                continue;
            }
            refspecs.push(ResolvedRefSpec::new(name.clone(), name));
        }
        Ok(refspecs)
    }

    fn upstream_spec(&self) -> SyncResult<ResolvedRefSpec> {
        let Some((branch, _, merge)) = self.current_upstream()? else {
            return Err(SyncError::NoUpstreamConfigured {
                branch: self.refs.current_branch()?,
            });
        };
        if self.refs.peel(&branch)?.is_none() {
            return Err(SyncError::LocalRefNotFound(branch));
        }
        let remote_ref = if merge.starts_with(REFS_PREFIX) {
            merge
        } else {
            format!("{}{}", HEADS_PREFIX, merge)
        };
        Ok(ResolvedRefSpec::new(branch, remote_ref))
    }

    /// Returns `(branch ref, remote, merge ref)` for the current branch.
    fn current_upstream(&self) -> SyncResult<Option<(String, String, String)>> {
        let Some(branch) = self.refs.current_branch()? else {
            return Ok(None);
        };
        let upstream = branch_name(&branch)
            .and_then(|short| self.config.upstream(short))
            .map(|up| (up.remote.clone(), up.merge.clone()));
        Ok(upstream.map(|(remote, merge)| (branch, remote, merge)))
    }
}

fn destination_namespace(local_ref: &str) -> &'static str {
    if local_ref.starts_with(TAGS_PREFIX) {
        TAGS_PREFIX
    } else {
        HEADS_PREFIX
    }
}

fn check_unique_destinations(refspecs: &[ResolvedRefSpec]) -> SyncResult<()> {
    let mut seen = HashSet::new();
    for spec in refspecs {
        if !seen.insert(spec.remote_ref.as_str()) {
            return Err(SyncError::invalid_refspec(
                spec.to_string(),
                format!("{} is the destination of more than one refspec", spec.remote_ref),
            ));
        }
    }
    Ok(())
}
