//! Prompt-skill Detector (component H): discovers skills hiding in
//! downstream prompts' front-matter, lazily and with a single shared cache.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use rmcp::model::{GetPromptRequestParam, PromptMessageContent};
use tokio::sync::RwLock;

use crate::client::ClientConnection;
use skills::frontmatter;

/// A skill exposed through a downstream prompt rather than a `SKILL.md` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSkill {
    pub server_name: String,
    pub prompt_name: String,
    pub name: String,
    pub description: String,
}

impl PromptSkill {
    /// The `prompt:{server}/{prompt}` location string used when no explicit
    /// `folder` was configured for this skill (§4.I).
    pub fn default_location(&self) -> String {
        format!("prompt:{}/{}", self.server_name, self.prompt_name)
    }
}

/// Single nullable cache slot, filled by whichever caller's detection pass
/// wins the race; later callers read the already-filled value (§5).
#[derive(Default)]
pub struct PromptSkillDetector {
    cache: RwLock<Option<Vec<PromptSkill>>>,
}

impl PromptSkillDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached detection results, running detection across
    /// `clients` on first call. `already_configured` should return true for
    /// `(server, prompt)` pairs already explicitly declared as skills in
    /// that server's config, which are excluded from auto-detection.
    pub async fn detect(
        &self,
        clients: &[Arc<ClientConnection>],
        already_configured: impl Fn(&str, &str) -> bool,
    ) -> Vec<PromptSkill> {
        if let Some(cached) = self.cache.read().await.clone() {
            return cached;
        }

        let mut guard = self.cache.write().await;
        if let Some(cached) = guard.clone() {
            return cached;
        }

        let found = run_detection(clients, already_configured).await;
        *guard = Some(found.clone());
        found
    }

    /// Drops the cache, forcing the next `detect` call to re-run discovery.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
    }
}

async fn run_detection(
    clients: &[Arc<ClientConnection>],
    already_configured: impl Fn(&str, &str) -> bool,
) -> Vec<PromptSkill> {
    let mut listings = FuturesUnordered::new();

    for client in clients {
        let client = Arc::clone(client);
        listings.push(async move {
            let name = client.name().to_string();
            match client.list_prompts().await {
                Ok(prompts) => Some((name, client, prompts)),
                Err(e) => {
                    log::warn!("[skill-detection] failed to list prompts on '{name}': {e}");
                    None
                }
            }
        });
    }

    let mut candidates = FuturesUnordered::new();
    let mut error_count = 0usize;

    while let Some(listed) = listings.next().await {
        let Some((server_name, client, prompts)) = listed else {
            error_count += 1;
            continue;
        };

        for prompt in prompts {
            if already_configured(&server_name, &prompt.name) {
                continue;
            }

            let client = Arc::clone(&client);
            let server_name = server_name.clone();
            let prompt_name = prompt.name.clone();

            candidates.push(async move {
                let params = GetPromptRequestParam {
                    name: prompt_name.clone(),
                    arguments: None,
                };

                match client.get_prompt(params).await {
                    Ok(result) => {
                        let content = concatenate_text(&result.messages);
                        Ok((server_name, prompt_name, content))
                    }
                    Err(e) => Err((server_name, prompt_name, e.to_string())),
                }
            });
        }
    }

    let mut skills = Vec::new();

    while let Some(outcome) = candidates.next().await {
        match outcome {
            Ok((server_name, prompt_name, content)) => {
                let (fields, _) = frontmatter::parse(&content);
                if let Some(fields) = fields.filter(frontmatter::is_valid_skill) {
                    skills.push(PromptSkill {
                        server_name,
                        prompt_name,
                        name: fields.get("name").cloned().unwrap_or_default(),
                        description: fields.get("description").cloned().unwrap_or_default(),
                    });
                }
            }
            Err((server_name, prompt_name, message)) => {
                error_count += 1;
                log::warn!("[skill-detection] failed to fetch prompt '{server_name}/{prompt_name}': {message}");
            }
        }
    }

    if error_count > 0 {
        log::debug!("[skill-detection] completed with {error_count} source error(s), {} skill(s) found", skills.len());
    }

    skills
}

fn concatenate_text(messages: &[rmcp::model::PromptMessage]) -> String {
    messages
        .iter()
        .filter_map(|message| match &message.content {
            PromptMessageContent::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Re-fetches a prompt's content to build the skill `instructions` body
/// (§4.I lookup step: auto-detected skills are re-fetched on demand rather
/// than keeping their body in the cache).
pub async fn fetch_instructions(client: &ClientConnection, prompt_name: &str) -> anyhow::Result<String> {
    let params = GetPromptRequestParam {
        name: prompt_name.to_string(),
        arguments: None,
    };
    let result = client.get_prompt(params).await?;
    let content = concatenate_text(&result.messages);
    let (_, body) = frontmatter::parse(&content);
    Ok(body)
}

/// Looks up a single prompt-skill by name across already-detected results.
pub fn find_by_name<'a>(skills: &'a [PromptSkill], name: &str) -> Option<&'a PromptSkill> {
    skills.iter().find(|s| s.name == name)
}

/// Indexes explicitly configured prompt-skills declared in server configs,
/// used both to exclude candidates from auto-detection and to answer
/// lookups before falling back to the auto-detected cache (§4.H).
pub fn index_configured(clients: &[Arc<ClientConnection>]) -> HashMap<(String, String), config::SkillSpec> {
    let mut index = HashMap::new();
    for client in clients {
        for (prompt_name, prompt_config) in &client.config().prompts {
            if let Some(spec) = &prompt_config.skill {
                index.insert((client.name().to_string(), prompt_name.clone()), spec.clone());
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_location_uses_prompt_reference_form() {
        let skill = PromptSkill {
            server_name: "Y".into(),
            prompt_name: "review".into(),
            name: "code-reviewer".into(),
            description: "Review code".into(),
        };
        assert_eq!(skill.default_location(), "prompt:Y/review");
    }

    #[test]
    fn find_by_name_matches_on_skill_name_not_prompt_name() {
        let skills = vec![PromptSkill {
            server_name: "Y".into(),
            prompt_name: "review".into(),
            name: "code-reviewer".into(),
            description: "Review code".into(),
        }];
        assert!(find_by_name(&skills, "code-reviewer").is_some());
        assert!(find_by_name(&skills, "review").is_none());
    }

    #[tokio::test]
    async fn cache_starts_empty_and_survives_clear() {
        let detector = PromptSkillDetector::new();
        assert!(detector.cache.read().await.is_none());
        detector.clear_cache().await;
        assert!(detector.cache.read().await.is_none());
    }
}
