use std::collections::HashMap;

use crate::error::TemplateError;
use crate::parse::{self, Layout};
use crate::types::{Platform, Tone};

const BUILTIN: &str = include_str!("templates.yaml");

/// Appended to the topic when no layout matches the request.
pub const FALLBACK_NOTICE: &str = "Генерация через шаблоны.";

/// Read-only `platform -> tone -> layout` lookup, built once at startup
/// and shared between requests.
#[derive(Debug, Clone)]
pub struct TemplateTable {
    layouts: HashMap<Platform, HashMap<Tone, Layout>>,
}

impl TemplateTable {
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_yaml(BUILTIN)
    }

    /// Every platform present must define all tones.
    pub fn from_yaml(yaml: &str) -> Result<Self, TemplateError> {
        let raw: HashMap<Platform, HashMap<Tone, String>> = serde_yaml::from_str(yaml)?;

        let mut layouts = HashMap::new();
        for (platform, tones) in raw {
            let mut parsed = HashMap::new();
            for tone in Tone::ALL {
                let source = tones.get(&tone).ok_or_else(|| TemplateError::Missing {
                    platform: platform.to_string(),
                    tone: tone.to_string(),
                })?;
                let layout = parse::parse(source).map_err(|message| TemplateError::Layout {
                    platform: platform.to_string(),
                    tone: tone.to_string(),
                    message,
                })?;
                parsed.insert(tone, layout);
            }
            layouts.insert(platform, parsed);
        }

        Ok(Self { layouts })
    }

    pub fn lookup(&self, platform: Platform, tone: Tone) -> Option<&Layout> {
        self.layouts.get(&platform)?.get(&tone)
    }

    pub fn render(&self, platform: Platform, tone: Tone, topic: &str) -> Option<String> {
        self.lookup(platform, tone).map(|layout| layout.render(topic))
    }

    pub fn fallback(topic: &str) -> String {
        format!("{}\n\n{}", topic, FALLBACK_NOTICE)
    }
}
