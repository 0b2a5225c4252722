// 🤖 AutoBot - Mark profiles that look like bots
// Selects candidates per profile, classifies them and commits the verdict

use crate::api::{ProfileApi, ProfileUpdate};
use crate::classifier::{classify, BotMatcher};
use crate::db::Identity;
use crate::errors::{ApiError, ApiResult, CMD_SUCCESS};
use crate::report::{Reporter, Template};
use crate::selector::CandidateSelector;

pub const AUTOBOT_DESCRIPTION: &str = "Auto-detects bot identities.";

/// Runs the bot classification over a set of sources.
///
/// Collaborators are borrowed for the duration of one invocation.
pub struct AutoBot<'a> {
    selector: &'a dyn CandidateSelector,
    api: &'a dyn ProfileApi,
    reporter: &'a dyn Reporter,
    matcher: BotMatcher,
}

impl<'a> AutoBot<'a> {
    pub fn new(
        selector: &'a dyn CandidateSelector,
        api: &'a dyn ProfileApi,
        reporter: &'a dyn Reporter,
    ) -> Self {
        AutoBot {
            selector,
            api,
            reporter,
            matcher: BotMatcher::new(),
        }
    }

    /// Detect bots among the profiles in `sources` and mark them.
    ///
    /// Every selected profile is processed in uuid order. The first failure
    /// stops the run and its code is returned; profiles after it are left
    /// untouched.
    pub fn mark_bots(&self, sources: &[String]) -> i32 {
        let span = tracing::info_span!("autobot", sources = ?sources);
        let _enter = span.enter();

        let candidates = match self.selector.select_candidates(sources) {
            Ok(c) => c,
            Err(e) => {
                let err = ApiError::database(format!("{:#}", e));
                self.reporter.error(&err.message);
                return err.code();
            }
        };

        let mut marked = 0usize;

        for (uuid, ids) in &candidates {
            let verdict = match classify(&self.matcher, ids) {
                Some(v) => v,
                None => {
                    tracing::debug!(uuid = %uuid, "no candidates, skipping");
                    continue;
                }
            };

            if let Err(e) = self.commit(uuid, verdict.is_bot, verdict.identity) {
                tracing::warn!(uuid = %uuid, kind = %e.kind, "commit failed, aborting");
                self.reporter.error(&e.message);
                return e.code();
            }

            if verdict.is_bot {
                marked += 1;
            }
        }

        tracing::info!(profiles = candidates.len(), bots = marked, "autobot finished");

        CMD_SUCCESS
    }

    /// Persist the verdict for one profile and report it.
    pub fn commit(&self, uuid: &str, is_bot: bool, identity: &Identity) -> ApiResult<()> {
        self.api.edit_profile(uuid, &ProfileUpdate::is_bot(is_bot))?;

        self.reporter.display(&Template::AutoProfile {
            uuid: uuid.to_string(),
            identity: identity.clone(),
        });

        Ok(())
    }
}
