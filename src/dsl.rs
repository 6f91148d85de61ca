//! JSON texture documents and their lowering into a [`TextureTable`].

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use log::info;
use serde::{Deserialize, Serialize};

use crate::compiler::{compile_textures, Program};
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::graph;
use crate::texture::{ImageId, ImageMap, Mapping3D, TexId, TextureKind, TextureTable, UvMapping2D};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TextureDocument {
    pub version: String,
    #[serde(default)]
    pub settings: CompilerConfig,
    #[serde(default)]
    pub images: Vec<ImageSpec>,
    pub textures: Vec<TextureSpec>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, `width * height` entries.
    pub pixels: Vec<[f32; 3]>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TextureSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    /// Input slot name to source texture name.
    #[serde(default)]
    pub inputs: HashMap<String, String>,
}

pub fn load_document_from_path(path: impl AsRef<std::path::Path>) -> Result<TextureDocument> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read texture json at {}", path.display()))?;
    parse_document(&text)
}

pub fn parse_document(text: &str) -> Result<TextureDocument> {
    serde_json::from_str(text).context("failed to parse texture json")
}

/// Keep only the textures `roots` depend on.
pub fn treeshake_unused_textures(doc: &TextureDocument, roots: &[&str]) -> TextureDocument {
    let mut keep: HashSet<&str> = HashSet::new();
    for root in roots {
        keep.extend(graph::upstream_reachable(doc, root));
    }

    TextureDocument {
        version: doc.version.clone(),
        settings: doc.settings,
        images: doc.images.clone(),
        textures: doc
            .textures
            .iter()
            .filter(|t| keep.contains(t.name.as_str()))
            .cloned()
            .collect(),
    }
}

/// Lower a document into a table whose children precede their parents.
pub fn build_table(doc: &TextureDocument) -> Result<TextureTable> {
    let mut table = TextureTable::new();

    let mut images: HashMap<&str, ImageId> = HashMap::new();
    for img in &doc.images {
        let id = table.add_image(ImageMap {
            name: img.name.clone(),
            width: img.width,
            height: img.height,
            pixels: img.pixels.iter().copied().map(Vec3::from_array).collect(),
        })?;
        images.insert(img.name.as_str(), id);
    }

    let order = graph::topo_sort(doc)?;
    let mut ids: HashMap<&str, TexId> = HashMap::with_capacity(order.len());
    for i in order {
        let spec = &doc.textures[i];
        let kind = parse_kind(spec, &images).with_context(|| format!("texture {}", spec.name))?;

        let slots = kind.input_names();
        if let Some(extra) = spec.inputs.keys().find(|k| !slots.iter().any(|s| s == k)) {
            bail!("texture {} ({}) has no input named {}", spec.name, spec.kind, extra);
        }
        let children = slots
            .iter()
            .map(|slot| {
                let source = spec
                    .inputs
                    .get(*slot)
                    .ok_or_else(|| anyhow!("texture {} is missing input {}", spec.name, slot))?;
                ids.get(source.as_str())
                    .copied()
                    .ok_or_else(|| anyhow!("texture {} input {} is not defined", spec.name, slot))
            })
            .collect::<Result<Vec<_>>>()?;

        let id = table
            .push(spec.name.clone(), kind, children)
            .with_context(|| format!("texture {}", spec.name))?;
        ids.insert(spec.name.as_str(), id);
    }

    info!(
        "lowered texture document v{}: {} textures, {} images",
        doc.version,
        table.len(),
        table.images().len()
    );
    Ok(table)
}

/// Lower and compile in one go, using the document's settings.
pub fn compile_document(doc: &TextureDocument) -> Result<(TextureTable, Program)> {
    let table = build_table(doc)?;
    let program = compile_textures(&table, &doc.settings).context("failed to compile textures")?;
    Ok((table, program))
}

fn parse_kind(spec: &TextureSpec, images: &HashMap<&str, ImageId>) -> Result<TextureKind> {
    let p = &spec.params;
    let kind = match spec.kind.as_str() {
        "constfloat1" => TextureKind::ConstFloat {
            value: parse_f32(p, "value").unwrap_or(0.0),
        },
        "constfloat3" => TextureKind::ConstColor {
            color: parse_vec3(p, "value").unwrap_or(Vec3::ZERO),
        },
        "imagemap" => {
            let name = parse_str(p, "image").ok_or_else(|| anyhow!("imagemap needs an image name"))?;
            let image = *images
                .get(name)
                .ok_or_else(|| anyhow!("unknown image {name}"))?;
            TextureKind::ImageMap {
                image,
                gain: parse_f32(p, "gain").unwrap_or(1.0),
                mapping: parse_uv_mapping(p)?,
            }
        }
        "hitpointcolor" => TextureKind::HitPointColor,
        "hitpointalpha" => TextureKind::HitPointAlpha,
        "hitpointgrey" => TextureKind::HitPointGrey {
            channel: parse_u32(p, "channel").filter(|&c| c <= 2).map(|c| c as u8),
        },
        "uv" => TextureKind::Uv {
            mapping: parse_uv_mapping(p)?,
        },
        "fbm" => TextureKind::Fbm {
            octaves: parse_u32(p, "octaves").unwrap_or(8),
            omega: parse_f32(p, "roughness").unwrap_or(0.5),
            mapping: parse_mapping3d(p)?,
        },
        "wrinkled" => TextureKind::Wrinkled {
            octaves: parse_u32(p, "octaves").unwrap_or(8),
            omega: parse_f32(p, "roughness").unwrap_or(0.5),
            mapping: parse_mapping3d(p)?,
        },
        "windy" => TextureKind::Windy {
            mapping: parse_mapping3d(p)?,
        },
        "marble" => TextureKind::Marble {
            octaves: parse_u32(p, "octaves").unwrap_or(8),
            omega: parse_f32(p, "roughness").unwrap_or(0.5),
            scale: parse_f32(p, "scale").unwrap_or(1.0),
            variation: parse_f32(p, "variation").unwrap_or(0.2),
            mapping: parse_mapping3d(p)?,
        },
        "scale" => TextureKind::Scale,
        "add" => TextureKind::Add,
        "subtract" => TextureKind::Subtract,
        "mix" => TextureKind::Mix,
        "divide" => TextureKind::Divide,
        "power" => TextureKind::Power,
        "abs" => TextureKind::Abs,
        "clamp" => TextureKind::Clamp {
            min: parse_f32(p, "min").unwrap_or(0.0),
            max: parse_f32(p, "max").unwrap_or(1.0),
        },
        "modulo" => TextureKind::Modulo,
        "dots" => TextureKind::Dots {
            mapping: parse_uv_mapping(p)?,
        },
        "checkerboard2d" => TextureKind::Checkerboard2D {
            mapping: parse_uv_mapping(p)?,
        },
        "checkerboard3d" => TextureKind::Checkerboard3D {
            mapping: parse_mapping3d(p)?,
        },
        "bilerp" => TextureKind::Bilerp,
        "band" => {
            let offsets: Vec<f32> = parse_param(p, "offsets")?.unwrap_or_default();
            let values: Vec<[f32; 3]> = parse_param(p, "values")?.unwrap_or_default();
            TextureKind::Band {
                offsets,
                values: values.into_iter().map(Vec3::from_array).collect(),
            }
        }
        "hsv" => TextureKind::HsvAdjust,
        "splitfloat3" => TextureKind::SplitFloat3 {
            channel: parse_u32(p, "channel").unwrap_or(0).min(2) as u8,
        },
        "makefloat3" => TextureKind::MakeFloat3,
        "normalmap" => TextureKind::NormalMap {
            scale: parse_f32(p, "scale").unwrap_or(1.0),
        },
        "triplanar" => TextureKind::Triplanar {
            mapping: parse_mapping3d(p)?,
        },
        "distort" => TextureKind::Distort {
            strength: parse_f32(p, "strength").unwrap_or(1.0),
        },
        other => {
            return Err(CompileError::UnknownKind {
                name: spec.name.clone(),
                tag: other.to_string(),
            }
            .into());
        }
    };
    Ok(kind)
}

pub fn parse_u32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<u32> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
}

pub fn parse_f32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<f32> {
    match params.get(key) {
        Some(v) => v
            .as_f64()
            .map(|x| x as f32)
            .or_else(|| v.as_u64().map(|x| x as f32))
            .or_else(|| v.as_i64().map(|x| x as f32)),
        None => None,
    }
}

pub fn parse_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// `[r, g, b]` or a single number broadcast to all channels.
pub fn parse_vec3(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<Vec3> {
    if let Some(v) = parse_f32(params, key) {
        return Some(Vec3::splat(v));
    }
    let arr = params.get(key)?.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    let c: Vec<f32> = arr.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect();
    (c.len() == 3).then(|| Vec3::new(c[0], c[1], c[2]))
}

fn parse_param<T: serde::de::DeserializeOwned>(
    params: &HashMap<String, serde_json::Value>,
    key: &str,
) -> Result<Option<T>> {
    params
        .get(key)
        .map(|v| serde_json::from_value(v.clone()).with_context(|| format!("invalid {key}")))
        .transpose()
}

fn parse_uv_mapping(params: &HashMap<String, serde_json::Value>) -> Result<UvMapping2D> {
    Ok(parse_param(params, "mapping")?.unwrap_or_default())
}

fn parse_mapping3d(params: &HashMap<String, serde_json::Value>) -> Result<Mapping3D> {
    Ok(parse_param(params, "mapping")?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: serde_json::Value) -> HashMap<String, serde_json::Value> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn vec3_accepts_scalar_or_triple() {
        let p = params(json!({ "a": 0.5, "b": [1, 2, 3], "c": [1, 2] }));
        assert_eq!(parse_vec3(&p, "a"), Some(Vec3::splat(0.5)));
        assert_eq!(parse_vec3(&p, "b"), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(parse_vec3(&p, "c"), None);
    }

    #[test]
    fn mapping_defaults_when_absent() {
        let p = params(json!({ "mapping": { "uScale": 2.0 } }));
        let m = parse_uv_mapping(&p).unwrap();
        assert_eq!(m.u_scale, 2.0);
        assert_eq!(m.v_scale, 1.0);
        assert_eq!(parse_mapping3d(&HashMap::new()).unwrap(), Mapping3D::default());
    }

    #[test]
    fn band_lengths_must_agree() {
        let doc: TextureDocument = serde_json::from_value(json!({
            "version": "1.0",
            "textures": [
                { "name": "a", "type": "constfloat1" },
                { "name": "b", "type": "band",
                  "params": { "offsets": [0.0, 1.0], "values": [[0, 0, 0]] },
                  "inputs": { "amount": "a" } }
            ]
        }))
        .unwrap();
        let err = build_table(&doc).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompileError>(),
            Some(CompileError::InvalidBand { .. })
        ));
    }

    #[test]
    fn corner_kinds_parse() {
        let spec = TextureSpec {
            name: "c".into(),
            kind: "checkerboard3d".into(),
            params: params(json!({ "mapping": { "type": "uv", "scale": [4, 4, 4], "translate": [0, 0, 0] } })),
            inputs: HashMap::new(),
        };
        let TextureKind::Checkerboard3D { mapping } = parse_kind(&spec, &HashMap::new()).unwrap() else {
            panic!("expected a 3D checker");
        };
        assert_eq!(
            mapping,
            Mapping3D::Uv {
                scale: Vec3::splat(4.0),
                translate: Vec3::ZERO
            }
        );

        let spec = TextureSpec {
            kind: "bilerp".into(),
            params: HashMap::new(),
            ..spec
        };
        let kind = parse_kind(&spec, &HashMap::new()).unwrap();
        assert_eq!(kind.input_names(), ["texture00", "texture01", "texture10", "texture11"]);
    }
}
