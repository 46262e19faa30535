use bevy::prelude::*;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BlendChannel {
    Base,
    Red,
    Green,
    Blue,
}

impl BlendChannel {
    pub const ALL: [Self; 4] = [Self::Base, Self::Red, Self::Green, Self::Blue];
}

/// Material every pack slot starts out with.
pub fn default_terrain_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::srgb(0.55, 0.7, 0.55),
        perceptual_roughness: 1.0,
        ..default()
    }
}

/// Four materials mixed by a blend map: `base` where the map is black, and
/// `red`, `green`, `blue` weighted by the matching channel. How they combine
/// is up to the shader. `TerrainPlugin` renders tiles with `base` alone and
/// leaves the layers and `blend_map` to a custom shading stage.
#[derive(Component, Clone, Debug)]
pub struct TerrainTexturePack {
    pub base: StandardMaterial,
    pub red: StandardMaterial,
    pub green: StandardMaterial,
    pub blue: StandardMaterial,
    pub blend_map: Option<Handle<Image>>,
}

impl Default for TerrainTexturePack {
    fn default() -> Self {
        Self {
            base: default_terrain_material(),
            red: default_terrain_material(),
            green: default_terrain_material(),
            blue: default_terrain_material(),
            blend_map: None,
        }
    }
}

impl TerrainTexturePack {
    pub fn slot(&self, channel: BlendChannel) -> &StandardMaterial {
        match channel {
            BlendChannel::Base => &self.base,
            BlendChannel::Red => &self.red,
            BlendChannel::Green => &self.green,
            BlendChannel::Blue => &self.blue,
        }
    }

    pub fn slot_mut(&mut self, channel: BlendChannel) -> &mut StandardMaterial {
        match channel {
            BlendChannel::Base => &mut self.base,
            BlendChannel::Red => &mut self.red,
            BlendChannel::Green => &mut self.green,
            BlendChannel::Blue => &mut self.blue,
        }
    }

    pub fn slots(&self) -> [&StandardMaterial; 4] {
        [&self.base, &self.red, &self.green, &self.blue]
    }
}
