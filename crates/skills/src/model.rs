/// Where a skill was discovered (§3 `Skill.location`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillLocation {
    /// Discovered under one of the configured skill paths.
    Project,
    /// Reserved for a user-level skill directory; not produced by the
    /// configured-path walk in §4.E, which only yields `Project`.
    User,
}

/// A named instruction document advertised alongside tools (§3 `Skill`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    /// Unique identity within the registry.
    pub name: String,
    /// Short description shown in the catalog.
    pub description: String,
    /// Where this skill was discovered.
    pub location: SkillLocation,
    /// Markdown body with front-matter stripped.
    pub content: String,
    /// Directory the skill file was found in.
    pub base_path: String,
}
