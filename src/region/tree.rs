//! Region tree construction and comparison

use crate::error::RegionError;
use crate::hash;
use crate::raster::Raster;
use crate::region::{stats, Quadrant, Region, RegionParams};
use crate::types::Hash;

/// One node of a region tree.
///
/// Leaves own no children; internal nodes own exactly four, in
/// `Quadrant::ORDER`, whose regions tile the parent region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionNode {
    region: Region,
    hash: Hash,
    children: Option<Box<[RegionNode; 4]>>,
}

impl RegionNode {
    fn leaf(region: Region, hash: Hash) -> Self {
        Self {
            region,
            hash,
            children: None,
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Children in `Quadrant::ORDER`, or `None` for a leaf.
    pub fn children(&self) -> Option<&[RegionNode; 4]> {
        self.children.as_deref()
    }

    pub fn child(&self, quadrant: Quadrant) -> Option<&RegionNode> {
        self.children().map(|c| &c[quadrant.index()])
    }
}

/// Hash-addressed quad decomposition of one image.
#[derive(Debug, Clone)]
pub struct RegionTree {
    root: RegionNode,
    params: RegionParams,
    image_width: u32,
    image_height: u32,
}

impl RegionTree {
    /// Decompose `raster` according to `params`.
    ///
    /// Fails on an empty image or invalid parameters.
    pub fn build(raster: &Raster, params: &RegionParams) -> Result<Self, RegionError> {
        params.validate()?;
        if raster.is_empty() {
            return Err(RegionError::EmptyImage {
                width: raster.width(),
                height: raster.height(),
            });
        }

        let root = build_node(raster, Region::full(raster), 0, params)?;

        Ok(Self {
            root,
            params: params.clone(),
            image_width: raster.width(),
            image_height: raster.height(),
        })
    }

    pub fn root(&self) -> &RegionNode {
        &self.root
    }

    pub fn root_hash(&self) -> &str {
        &self.root.hash
    }

    pub fn params(&self) -> &RegionParams {
        &self.params
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    /// Leaves in depth-first, `Quadrant::ORDER` order.
    pub fn leaves(&self) -> Vec<&RegionNode> {
        let mut out = Vec::new();
        collect_leaves(&self.root, &mut out);
        out
    }

    /// Leaf hashes in the same order as [`RegionTree::leaves`].
    ///
    /// This sequence feeds the commitment tree, so its order must not change.
    pub fn leaf_hashes(&self) -> Vec<Hash> {
        self.leaves().into_iter().map(|n| n.hash.clone()).collect()
    }

    pub fn leaf_regions(&self) -> Vec<Region> {
        self.leaves().into_iter().map(|n| n.region).collect()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    pub fn node_count(&self) -> usize {
        count_nodes(&self.root)
    }

    /// Depth of the deepest leaf (the root alone has depth 0).
    pub fn depth(&self) -> u32 {
        max_depth(&self.root)
    }

    /// Regions that differ between `self` and `other`.
    ///
    /// Equal hashes prune a subtree. Where one side is a leaf and the other
    /// is internal, the leaf's whole region is reported.
    pub fn find_different_regions(&self, other: &RegionTree) -> Result<Vec<Region>, RegionError> {
        if self.image_size() != other.image_size() {
            return Err(RegionError::DimensionMismatch {
                left: self.image_size(),
                right: other.image_size(),
            });
        }
        if !self.params.same_shape_as(&other.params) {
            return Err(RegionError::ParamsMismatch);
        }

        let mut regions = Vec::new();
        diff_nodes(&self.root, &other.root, &mut regions);
        Ok(regions)
    }
}

fn is_leaf_region(raster: &Raster, region: &Region, depth: u32, params: &RegionParams) -> bool {
    depth >= params.max_depth
        || region.width <= params.min_size
        || region.height <= params.min_size
        || stats::is_homogeneous(raster, region, params.threshold)
}

fn leaf_hash(raster: &Raster, region: &Region) -> Hash {
    let rows = (region.y..region.y + region.height).map(|y| raster.row_span(region.x, y, region.width));
    hash::compute_leaf_hash(region.width, region.height, raster.channels(), rows)
}

fn build_node(
    raster: &Raster,
    region: Region,
    depth: u32,
    params: &RegionParams,
) -> Result<RegionNode, RegionError> {
    region.validate_within(raster.width(), raster.height())?;

    if is_leaf_region(raster, &region, depth, params) {
        return Ok(RegionNode::leaf(region, leaf_hash(raster, &region)));
    }

    let [tl, tr, bl, br] = region.split();
    let children = if depth < params.parallel_depth {
        let ((a, b), (c, d)) = rayon::join(
            || {
                rayon::join(
                    || build_node(raster, tl, depth + 1, params),
                    || build_node(raster, tr, depth + 1, params),
                )
            },
            || {
                rayon::join(
                    || build_node(raster, bl, depth + 1, params),
                    || build_node(raster, br, depth + 1, params),
                )
            },
        );
        [a?, b?, c?, d?]
    } else {
        [
            build_node(raster, tl, depth + 1, params)?,
            build_node(raster, tr, depth + 1, params)?,
            build_node(raster, bl, depth + 1, params)?,
            build_node(raster, br, depth + 1, params)?,
        ]
    };

    let hash = hash::combine_quad([
        children[0].hash.as_str(),
        children[1].hash.as_str(),
        children[2].hash.as_str(),
        children[3].hash.as_str(),
    ]);

    Ok(RegionNode {
        region,
        hash,
        children: Some(Box::new(children)),
    })
}

fn collect_leaves<'a>(node: &'a RegionNode, out: &mut Vec<&'a RegionNode>) {
    match node.children() {
        None => out.push(node),
        Some(children) => {
            for child in children.iter() {
                collect_leaves(child, out);
            }
        }
    }
}

fn count_nodes(node: &RegionNode) -> usize {
    1 + node
        .children()
        .map(|c| c.iter().map(count_nodes).sum::<usize>())
        .unwrap_or(0)
}

fn max_depth(node: &RegionNode) -> u32 {
    node.children()
        .map(|c| 1 + c.iter().map(max_depth).max().unwrap_or(0))
        .unwrap_or(0)
}

fn diff_nodes(left: &RegionNode, right: &RegionNode, regions: &mut Vec<Region>) {
    if left.hash == right.hash {
        return;
    }
    match (left.children(), right.children()) {
        (Some(l), Some(r)) => {
            for (a, b) in l.iter().zip(r.iter()) {
                diff_nodes(a, b, regions);
            }
        }
        (None, Some(_)) => regions.push(left.region),
        (Some(_), None) => regions.push(right.region),
        (None, None) => regions.push(left.region),
    }
}
