//! Identification and presentation kinds.

use hearth_component::Component;
use serde::{Deserialize, Serialize};

/// A unique, human-readable entity name. The world keeps a name index in
/// sync with this component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name(pub String);

impl Name {
    /// Wrap a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Component for Name {
    fn type_name() -> &'static str {
        "Name"
    }
}

/// A reference to a sprite asset for an external renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteRef {
    /// Asset path or key, resolved by the renderer.
    pub asset: String,
    /// Draw order; higher draws on top.
    pub layer: i32,
    /// RGBA tint.
    pub tint: [f32; 4],
    /// Whether the sprite is drawn at all.
    pub visible: bool,
}

impl SpriteRef {
    /// A visible, untinted sprite on layer 0.
    #[must_use]
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            ..Self::default()
        }
    }

    /// Builder: set the draw layer.
    #[must_use]
    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }
}

impl Default for SpriteRef {
    fn default() -> Self {
        Self {
            asset: String::new(),
            layer: 0,
            tint: [1.0; 4],
            visible: true,
        }
    }
}

impl Component for SpriteRef {
    fn type_name() -> &'static str {
        "SpriteRef"
    }
}
