use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{bail, Result};

use crate::dsl::TextureDocument;

/// Order document textures so every texture comes after its inputs.
///
/// Returns indices into `doc.textures`. Ties keep document order, so the
/// same document always lowers to the same table.
pub fn topo_sort(doc: &TextureDocument) -> Result<Vec<usize>> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(doc.textures.len());
    for (i, tex) in doc.textures.iter().enumerate() {
        if index.insert(tex.name.as_str(), i).is_some() {
            bail!("duplicate texture name: {}", tex.name);
        }
    }

    let mut indeg = vec![0usize; doc.textures.len()];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); doc.textures.len()];
    for (i, tex) in doc.textures.iter().enumerate() {
        // one edge per distinct input, so a texture used twice counts once
        let mut seen: HashSet<&str> = HashSet::new();
        for (slot, source) in sorted_inputs(&tex.inputs) {
            let Some(&from) = index.get(source) else {
                bail!(
                    "texture {} input {} references missing texture: {}",
                    tex.name,
                    slot,
                    source
                );
            };
            if seen.insert(source) {
                indeg[i] += 1;
                outgoing[from].push(i);
            }
        }
    }

    let mut q: VecDeque<usize> = (0..doc.textures.len()).filter(|&i| indeg[i] == 0).collect();
    let mut order: Vec<usize> = Vec::with_capacity(doc.textures.len());

    while let Some(n) = q.pop_front() {
        order.push(n);
        for &m in &outgoing[n] {
            indeg[m] -= 1;
            if indeg[m] == 0 {
                q.push_back(m);
            }
        }
    }

    if order.len() != doc.textures.len() {
        let stuck: Vec<&str> = (0..doc.textures.len())
            .filter(|&i| indeg[i] > 0)
            .map(|i| doc.textures[i].name.as_str())
            .collect();
        bail!("cycle detected between textures: {}", stuck.join(", "));
    }
    Ok(order)
}

/// Textures `start` depends on, itself included.
pub fn upstream_reachable<'a>(doc: &'a TextureDocument, start: &'a str) -> HashSet<&'a str> {
    let by_name: HashMap<&str, &HashMap<String, String>> = doc
        .textures
        .iter()
        .map(|t| (t.name.as_str(), &t.inputs))
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![start];
    while let Some(n) = stack.pop() {
        if !visited.insert(n) {
            continue;
        }
        if let Some(&inputs) = by_name.get(n) {
            stack.extend(inputs.values().map(String::as_str));
        }
    }
    visited
}

fn sorted_inputs(inputs: &HashMap<String, String>) -> Vec<(&str, &str)> {
    let mut v: Vec<(&str, &str)> = inputs
        .iter()
        .map(|(slot, source)| (slot.as_str(), source.as_str()))
        .collect();
    v.sort_unstable();
    v
}
