//! Texture Definition Table: a flat arena of texture nodes linked by index.
//!
//! Children always precede their parents, so the arena is acyclic by
//! construction. Nodes may still be shared by several parents (the table is
//! a DAG), and the compiler deliberately re-emits a shared child at every
//! point of use.

pub mod kernels;
pub mod mapping;
pub mod noise;

use std::fmt;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::CompileError;
pub use mapping::{Mapping3D, UvMapping2D};

/// Maximum number of control points a [`TextureKind::Band`] node can hold.
pub const BAND_MAX_POINTS: usize = 16;

/// Index of a node in a [`TextureTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TexId(pub u32);

impl TexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of an image in a [`TextureTable`]'s image store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub u32);

/// In-memory RGB image sampled by [`TextureKind::ImageMap`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec3>,
}

impl ImageMap {
    fn texel(&self, x: i64, y: i64) -> Vec3 {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.pixels[y * self.width as usize + x]
    }

    /// Bilinear lookup with repeat wrapping.
    pub fn lookup(&self, uv: Vec2) -> Vec3 {
        let s = uv.x * self.width as f32 - 0.5;
        let t = uv.y * self.height as f32 - 0.5;
        let s0 = s.floor();
        let t0 = t.floor();
        let ds = s - s0;
        let dt = t - t0;
        // wrap before converting so the +1 neighbours cannot overflow
        let x = s0.rem_euclid(self.width as f32) as i64;
        let y = t0.rem_euclid(self.height as f32) as i64;

        (1.0 - ds) * (1.0 - dt) * self.texel(x, y)
            + (1.0 - ds) * dt * self.texel(x, y + 1)
            + ds * (1.0 - dt) * self.texel(x + 1, y)
            + ds * dt * self.texel(x + 1, y + 1)
    }
}

/// Closed set of texture kinds, with their kind-specific parameters.
///
/// Child references live in [`TextureNode::children`], in the order given by
/// [`TextureKind::input_names`].
#[derive(Clone, Debug, PartialEq)]
pub enum TextureKind {
    ConstFloat { value: f32 },
    ConstColor { color: Vec3 },
    ImageMap { image: ImageId, gain: f32, mapping: UvMapping2D },
    HitPointColor,
    HitPointAlpha,
    /// `None` selects luminance instead of a single channel.
    HitPointGrey { channel: Option<u8> },
    Uv { mapping: UvMapping2D },
    Fbm { octaves: u32, omega: f32, mapping: Mapping3D },
    Wrinkled { octaves: u32, omega: f32, mapping: Mapping3D },
    Windy { mapping: Mapping3D },
    Marble {
        octaves: u32,
        omega: f32,
        scale: f32,
        variation: f32,
        mapping: Mapping3D,
    },

    Scale,
    Add,
    Subtract,
    Mix,
    Divide,
    Power,
    Abs,
    Clamp { min: f32, max: f32 },
    Modulo,
    Dots { mapping: UvMapping2D },
    Checkerboard2D { mapping: UvMapping2D },
    Checkerboard3D { mapping: Mapping3D },
    /// Bilinear blend of four corner textures over the fractional UV.
    Bilerp,
    Band { offsets: Vec<f32>, values: Vec<Vec3> },
    HsvAdjust,
    SplitFloat3 { channel: u8 },
    MakeFloat3,
    NormalMap { scale: f32 },

    Triplanar { mapping: Mapping3D },
    Distort { strength: f32 },
}

impl TextureKind {
    /// Document tag of this kind.
    pub fn tag(&self) -> &'static str {
        use TextureKind::*;
        match self {
            ConstFloat { .. } => "constfloat1",
            ConstColor { .. } => "constfloat3",
            ImageMap { .. } => "imagemap",
            HitPointColor => "hitpointcolor",
            HitPointAlpha => "hitpointalpha",
            HitPointGrey { .. } => "hitpointgrey",
            Uv { .. } => "uv",
            Fbm { .. } => "fbm",
            Wrinkled { .. } => "wrinkled",
            Windy { .. } => "windy",
            Marble { .. } => "marble",
            Scale => "scale",
            Add => "add",
            Subtract => "subtract",
            Mix => "mix",
            Divide => "divide",
            Power => "power",
            Abs => "abs",
            Clamp { .. } => "clamp",
            Modulo => "modulo",
            Dots { .. } => "dots",
            Checkerboard2D { .. } => "checkerboard2d",
            Checkerboard3D { .. } => "checkerboard3d",
            Bilerp => "bilerp",
            Band { .. } => "band",
            HsvAdjust => "hsv",
            SplitFloat3 { .. } => "splitfloat3",
            MakeFloat3 => "makefloat3",
            NormalMap { .. } => "normalmap",
            Triplanar { .. } => "triplanar",
            Distort { .. } => "distort",
        }
    }

    /// Names of the child slots, in child order.
    pub fn input_names(&self) -> &'static [&'static str] {
        use TextureKind::*;
        match self {
            ConstFloat { .. }
            | ConstColor { .. }
            | ImageMap { .. }
            | HitPointColor
            | HitPointAlpha
            | HitPointGrey { .. }
            | Uv { .. }
            | Fbm { .. }
            | Wrinkled { .. }
            | Windy { .. }
            | Marble { .. } => &[],
            Scale | Add | Subtract | Divide => &["texture1", "texture2"],
            Mix => &["amount", "texture1", "texture2"],
            Power => &["base", "exponent"],
            Abs | Clamp { .. } | NormalMap { .. } | SplitFloat3 { .. } => &["texture"],
            Modulo => &["texture", "modulo"],
            Dots { .. } => &["inside", "outside"],
            Checkerboard2D { .. } | Checkerboard3D { .. } => &["texture1", "texture2"],
            Bilerp => &["texture00", "texture01", "texture10", "texture11"],
            Band { .. } => &["amount"],
            HsvAdjust => &["texture", "hue", "saturation", "value"],
            MakeFloat3 => &["texture1", "texture2", "texture3"],
            Triplanar { .. } => &["texture1", "texture2", "texture3"],
            Distort { .. } => &["texture", "offset"],
        }
    }

    pub fn arity(&self) -> usize {
        self.input_names().len()
    }

    /// `(limit, found)` for kinds with a bounded inline parameter array.
    pub fn capacity_use(&self) -> Option<(usize, usize)> {
        match self {
            TextureKind::Band { offsets, values } => {
                Some((BAND_MAX_POINTS, offsets.len().max(values.len())))
            }
            _ => None,
        }
    }
}

/// One entry of the Definition Table.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureNode {
    pub name: String,
    pub kind: TextureKind,
    pub children: Vec<TexId>,
}

impl TextureNode {
    pub fn child(&self, slot: usize) -> TexId {
        self.children[slot]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureTable {
    nodes: Vec<TextureNode>,
    images: Vec<ImageMap>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Panics
    ///
    /// If `id` is not in the table; see [`TextureTable::get`].
    pub fn node(&self, id: TexId) -> &TextureNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: TexId) -> Option<&TextureNode> {
        self.nodes.get(id.index())
    }

    pub fn image(&self, id: ImageId) -> &ImageMap {
        &self.images[id.0 as usize]
    }

    pub fn images(&self) -> &[ImageMap] {
        &self.images
    }

    pub fn ids(&self) -> impl Iterator<Item = TexId> + '_ {
        (0..self.nodes.len() as u32).map(TexId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TexId, &TextureNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (TexId(idx as u32), node))
    }

    pub fn find(&self, name: &str) -> Option<TexId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|idx| TexId(idx as u32))
    }

    pub fn add_image(&mut self, image: ImageMap) -> Result<ImageId, CompileError> {
        let expected = image.width as usize * image.height as usize;
        if expected == 0 || image.pixels.len() != expected {
            return Err(CompileError::ImageSize {
                name: image.name,
                width: image.width,
                height: image.height,
                found: image.pixels.len(),
            });
        }
        self.images.push(image);
        Ok(ImageId(self.images.len() as u32 - 1))
    }

    /// Append a node. Children must already be in the table.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        kind: TextureKind,
        children: Vec<TexId>,
    ) -> Result<TexId, CompileError> {
        let id = TexId(self.nodes.len() as u32);
        let node = TextureNode {
            name: name.into(),
            kind,
            children,
        };
        self.validate(id, &node)?;
        self.nodes.push(node);
        Ok(id)
    }

    /// Replace the definition of an existing node in place.
    ///
    /// The new children must still precede `id`.
    pub fn replace(
        &mut self,
        id: TexId,
        kind: TextureKind,
        children: Vec<TexId>,
    ) -> Result<(), CompileError> {
        let name = match self.get(id) {
            Some(old) => old.name.clone(),
            None => return Err(self.unknown(id)),
        };
        let node = TextureNode { name, kind, children };
        self.validate(id, &node)?;
        self.nodes[id.index()] = node;
        Ok(())
    }

    /// Remove a node nobody references. Later nodes shift down by one.
    pub fn remove(&mut self, id: TexId) -> Result<TextureNode, CompileError> {
        if id.index() >= self.nodes.len() {
            return Err(self.unknown(id));
        }
        if let Some((by, _)) = self.iter().find(|(_, n)| n.children.contains(&id)) {
            return Err(CompileError::StillReferenced { node: id, by });
        }
        let removed = self.nodes.remove(id.index());
        for node in &mut self.nodes {
            for child in &mut node.children {
                if child.0 > id.0 {
                    child.0 -= 1;
                }
            }
        }
        Ok(removed)
    }

    fn unknown(&self, node: TexId) -> CompileError {
        CompileError::UnknownNode {
            node,
            count: self.nodes.len(),
        }
    }

    fn validate(&self, id: TexId, node: &TextureNode) -> Result<(), CompileError> {
        let expected = node.kind.arity();
        if node.children.len() != expected {
            return Err(CompileError::ChildArity {
                node: id,
                kind: node.kind.tag(),
                expected,
                found: node.children.len(),
            });
        }
        if let Some(&child) = node.children.iter().find(|c| c.0 >= id.0) {
            return Err(CompileError::DanglingChild { node: id, child });
        }
        if let TextureKind::ImageMap { image, .. } = node.kind {
            if image.0 as usize >= self.images.len() {
                return Err(CompileError::UnknownImage {
                    node: id,
                    image: image.0,
                });
            }
        }
        check_capacity(id, &node.kind)?;
        if let TextureKind::Band { offsets, values } = &node.kind {
            check_band(id, offsets, values)?;
        }
        Ok(())
    }
}

/// Band control points must pair up and be sorted by offset.
fn check_band(id: TexId, offsets: &[f32], values: &[Vec3]) -> Result<(), CompileError> {
    let invalid = |reason| CompileError::InvalidBand { node: id, reason };
    if offsets.len() != values.len() {
        return Err(invalid("offsets and values differ in length"));
    }
    if offsets.iter().any(|o| !o.is_finite()) {
        return Err(invalid("offsets must be finite"));
    }
    if offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err(invalid("offsets must be sorted"));
    }
    Ok(())
}

/// Fails when a bounded-array kind holds more entries than it supports.
pub fn check_capacity(id: TexId, kind: &TextureKind) -> Result<(), CompileError> {
    match kind.capacity_use() {
        Some((limit, found)) if found > limit => Err(CompileError::CapacityExceeded {
            node: id,
            kind: kind.tag(),
            limit,
            found,
        }),
        _ => Ok(()),
    }
}
