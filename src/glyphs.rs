/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Category-to-glyph resolution for rendered nodes.
//!
//! Dataset categories are free-form strings; the registry maps them to
//! drawable glyphs and degrades to the fallback for anything unregistered,
//! reporting whether the fallback was used so hosts can surface gaps.

use std::collections::HashMap;

pub const GLYPH_CATEGORY_DEFAULT: &str = "default";

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphData {
    pub symbol: char,
    pub tint_rgb: (u8, u8, u8),
    pub scale: f32,
}

impl GlyphData {
    fn fallback() -> Self {
        GlyphData { symbol: '\u{25CF}', tint_rgb: (80, 220, 255), scale: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub struct GlyphResolution {
    pub requested_category: String,
    pub resolved_category: String,
    pub matched: bool,
    pub fallback_used: bool,
    pub glyph: GlyphData,
}

pub struct GlyphRegistry {
    glyphs: HashMap<String, GlyphData>,
    fallback_category: String,
}

impl GlyphRegistry {
    pub fn register(&mut self, category: &str, glyph: GlyphData) {
        self.glyphs.insert(category.trim().to_ascii_lowercase(), glyph);
    }

    pub fn register_core_seed_defaults(&mut self) {
        self.register(GLYPH_CATEGORY_DEFAULT, GlyphData::fallback());
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.glyphs.keys().map(String::as_str)
    }

    pub fn resolve(&self, category: &str) -> GlyphResolution {
        let requested = category.trim().to_ascii_lowercase();
        let fallback_glyph = self
            .glyphs
            .get(&self.fallback_category)
            .cloned()
            .unwrap_or_else(GlyphData::fallback);

        if !requested.is_empty()
            && let Some(glyph) = self.glyphs.get(&requested).cloned()
        {
            return GlyphResolution {
                requested_category: requested.clone(),
                resolved_category: requested,
                matched: true,
                fallback_used: false,
                glyph,
            };
        }

        GlyphResolution {
            requested_category: requested,
            resolved_category: self.fallback_category.clone(),
            matched: false,
            fallback_used: true,
            glyph: fallback_glyph,
        }
    }
}

impl Default for GlyphRegistry {
    fn default() -> Self {
        let mut registry = Self {
            glyphs: HashMap::new(),
            fallback_category: GLYPH_CATEGORY_DEFAULT.to_string(),
        };
        registry.register_core_seed_defaults();
        registry
    }
}
