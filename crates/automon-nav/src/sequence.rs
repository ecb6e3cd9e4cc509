//! Click sequences
//!
//! A sequence is an ordered script of "click this, then wait for that". Each
//! step lists one or more alternative assets; the first one found on screen
//! wins. Only the final step may be empty, meaning the last click has no
//! successor screen to wait for.
//!
//! Sequence files are JSON objects mapping a name to its steps, where a step
//! is an asset name, an array of alternatives, or `null`:
//!
//! ```json
//! { "open_shop": ["menu.png", ["shop.png", "shop_sale.png"], null] }
//! ```

use anyhow::Context;
use automon_core::{AssetId, Error, Result};
use automon_cv::TemplateStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One or more alternative assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    assets: Vec<AssetId>,
}

impl Step {
    pub fn new(assets: Vec<AssetId>) -> Result<Self> {
        if assets.is_empty() {
            return Err(Error::InvalidSequence("step has no assets".to_string()));
        }
        Ok(Self { assets })
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }
}

impl From<AssetId> for Step {
    fn from(asset: AssetId) -> Self {
        Self { assets: vec![asset] }
    }
}

/// Validated, named list of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name: String,
    steps: Vec<Option<Step>>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, steps: Vec<Option<Step>>) -> Result<Self> {
        let name = name.into();
        match steps.first() {
            None => return Err(Error::InvalidSequence(format!("'{}' is empty", name))),
            Some(None) => {
                return Err(Error::InvalidSequence(format!("'{}' starts with an empty step", name)));
            }
            Some(Some(_)) => {}
        }
        if let Some(i) = steps[..steps.len() - 1].iter().position(Option::is_none) {
            return Err(Error::InvalidSequence(format!(
                "'{}' has an empty step at {} before the end",
                name, i
            )));
        }
        Ok(Self { name, steps })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Option<Step>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Assets of step `index`, empty for the trailing `None`
    pub fn step_assets(&self, index: usize) -> &[AssetId] {
        match self.steps.get(index) {
            Some(Some(step)) => step.assets(),
            _ => &[],
        }
    }
}

/// Serialized step form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawStep {
    One(String),
    Any(Vec<String>),
}

impl RawStep {
    fn names(&self) -> Vec<&str> {
        match self {
            RawStep::One(name) => vec![name.as_str()],
            RawStep::Any(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Named sequences as loaded from a JSON file, not yet checked against a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceBook {
    sequences: BTreeMap<String, Vec<Option<RawStep>>>,
}

impl SequenceBook {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read sequences: {:?}", path.as_ref()))?;
        Self::from_json(&text).with_context(|| format!("Invalid sequences: {:?}", path.as_ref()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }

    /// Resolve one sequence, checking every asset against `store`
    pub fn sequence(&self, name: &str, store: &TemplateStore) -> Result<Sequence> {
        let raw = self
            .sequences
            .get(name)
            .ok_or_else(|| Error::InvalidSequence(format!("no sequence named '{}'", name)))?;

        let mut steps = Vec::with_capacity(raw.len());
        for step in raw {
            let resolved = match step {
                Some(step) => {
                    let assets = step
                        .names()
                        .into_iter()
                        .map(|n| store.resolve(n))
                        .collect::<Result<Vec<_>>>()?;
                    Some(Step::new(assets)?)
                }
                None => None,
            };
            steps.push(resolved);
        }
        Sequence::new(name, steps)
    }

    /// Resolve every sequence, failing on the first invalid one
    pub fn resolve_all(&self, store: &TemplateStore) -> Result<Vec<Sequence>> {
        self.names().map(|name| self.sequence(name, store)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automon_cv::Template;
    use image::RgbImage;

    fn store() -> TemplateStore {
        TemplateStore::from_templates(
            ["menu.png", "shop.png", "sale.png"]
                .into_iter()
                .map(|n| Template::new(AssetId::new(n), RgbImage::new(2, 2))),
        )
    }

    fn step(name: &str) -> Option<Step> {
        Some(Step::from(AssetId::new(name)))
    }

    #[test]
    fn test_only_last_step_may_be_empty() {
        assert!(Sequence::new("ok", vec![step("a"), step("b"), None]).is_ok());
        assert!(Sequence::new("single", vec![step("a")]).is_ok());
        assert!(Sequence::new("empty", vec![]).is_err());
        assert!(Sequence::new("lead", vec![None, step("a")]).is_err());
        assert!(Sequence::new("middle", vec![step("a"), None, step("b")]).is_err());
        assert!(Step::new(vec![]).is_err());
    }

    #[test]
    fn test_book_resolves_against_store() -> anyhow::Result<()> {
        let book = SequenceBook::from_json(
            r#"{
                "open_shop": ["menu.png", ["shop.png", "sale.png"], null],
                "broken": ["menu.png", "nowhere.png"]
            }"#,
        )?;
        let store = store();

        let seq = book.sequence("open_shop", &store)?;
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.step_assets(1).len(), 2);
        assert!(seq.step_assets(2).is_empty());

        assert!(matches!(
            book.sequence("broken", &store),
            Err(Error::UnknownAsset(name)) if name == "nowhere.png"
        ));
        assert!(matches!(book.sequence("missing", &store), Err(Error::InvalidSequence(_))));
        assert!(book.resolve_all(&store).is_err());
        Ok(())
    }
}
