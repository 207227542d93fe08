//! Image-to-scene alignment.
//!
//! Alignment runs in two steps. [`plan_alignment`] is pure: it decides
//! which image each timing interval shows. [`materialize`] then writes
//! one scratch file per interval, so intervals that share a source image
//! never share a file.
//!
//! For each interval, in order:
//! 1. the first image tagged with its scene number, if any;
//! 2. otherwise the lowest-numbered image not yet used (untagged images
//!    come after all tagged ones, in input order);
//! 3. otherwise the previous interval's image again.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use reel_models::{AlignedSegment, AlignmentPolicy, ImageAsset, ImageSource, TimingInterval};

use crate::error::{CompileError, CompileResult};

/// One interval's chosen image.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSegment {
    pub interval: TimingInterval,
    /// Index into the image list handed to [`plan_alignment`]
    pub asset_index: usize,
    pub policy: AlignmentPolicy,
}

/// Image choices for a whole timeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignmentPlan {
    /// One entry per timing interval, in timing order
    pub segments: Vec<PlannedSegment>,
    pub warnings: Vec<String>,
}

impl AlignmentPlan {
    /// Number of intervals that did not get their own scene's image.
    pub fn fallback_count(&self) -> usize {
        self.segments.iter().filter(|s| s.policy.is_fallback()).count()
    }
}

/// Decide which image each interval shows.
///
/// Deterministic: the same timings and images always give the same plan.
/// Fails only when images are needed and none were supplied.
pub fn plan_alignment(timings: &[TimingInterval], images: &[ImageAsset]) -> CompileResult<AlignmentPlan> {
    let mut plan = AlignmentPlan::default();
    if timings.is_empty() {
        return Ok(plan);
    }

    let mut by_scene: BTreeMap<u32, usize> = BTreeMap::new();
    let mut untagged = Vec::new();
    for (idx, image) in images.iter().enumerate() {
        match image.scene_number {
            Some(scene) => {
                if let Some(&first) = by_scene.get(&scene) {
                    let msg = format!(
                        "Scene {} has more than one image; keeping image #{} and ignoring #{}",
                        scene, first, idx
                    );
                    let kept_hash = images[first].content_hash().unwrap_or_default();
                    let ignored_hash = image.content_hash().unwrap_or_default();
                    warn!(
                        scene_number = scene,
                        kept_hash = %kept_hash,
                        ignored_hash = %ignored_hash,
                        "{}", msg
                    );
                    plan.warnings.push(msg);
                } else {
                    by_scene.insert(scene, idx);
                }
            }
            None => untagged.push(idx),
        }
    }
    plan.warnings.extend(shared_content_warnings(images));

    // BTreeMap iteration gives the lowest scene number first.
    let borrow_order: Vec<usize> = by_scene.values().copied().chain(untagged).collect();
    let mut used: HashSet<usize> = HashSet::new();
    let mut previous: Option<usize> = None;

    for interval in timings {
        let scene = interval.scene_number;

        let (asset_index, policy) = if let Some(&idx) = by_scene.get(&scene) {
            (idx, AlignmentPolicy::Matched)
        } else if let Some(&idx) = borrow_order.iter().find(|idx| !used.contains(*idx)) {
            let from_scene = images[idx].scene_number;
            let msg = match from_scene {
                Some(from) => format!("Scene {} has no image; borrowing scene {}'s image", scene, from),
                None => format!("Scene {} has no image; using untagged image #{}", scene, idx),
            };
            warn!(scene_number = scene, "{}", msg);
            plan.warnings.push(msg);
            (idx, AlignmentPolicy::Borrowed { from_scene })
        } else if let Some(idx) = previous {
            let msg = format!(
                "Scene {} has no image and none are unused; repeating the previous image",
                scene
            );
            warn!(scene_number = scene, "{}", msg);
            plan.warnings.push(msg);
            (idx, AlignmentPolicy::Repeated)
        } else {
            return Err(CompileError::alignment_exhausted(format!(
                "no image available for scene {}",
                scene
            )));
        };

        if policy.is_fallback() {
            metrics::counter!(
                "reel_alignment_fallbacks_total",
                "policy" => policy_label(&policy)
            )
            .increment(1);
        }

        used.insert(asset_index);
        previous = Some(asset_index);
        plan.segments.push(PlannedSegment {
            interval: *interval,
            asset_index,
            policy,
        });
    }

    debug!(
        segments = plan.segments.len(),
        fallbacks = plan.fallback_count(),
        "Planned image alignment"
    );
    Ok(plan)
}

fn policy_label(policy: &AlignmentPolicy) -> &'static str {
    match policy {
        AlignmentPolicy::Matched => "matched",
        AlignmentPolicy::Borrowed { .. } => "borrowed",
        AlignmentPolicy::Repeated => "repeated",
    }
}

/// Warn about byte-identical images tagged to different scenes.
///
/// Usually means the generator returned the same picture twice.
fn shared_content_warnings(images: &[ImageAsset]) -> Vec<String> {
    let mut by_hash: HashMap<String, Vec<u32>> = HashMap::new();
    for image in images {
        if let (Some(scene), Some(hash)) = (image.scene_number, image.content_hash()) {
            let scenes = by_hash.entry(hash).or_default();
            if !scenes.contains(&scene) {
                scenes.push(scene);
            }
        }
    }

    let mut warnings: Vec<String> = by_hash
        .into_iter()
        .filter(|(_, scenes)| scenes.len() > 1)
        .map(|(hash, mut scenes)| {
            scenes.sort_unstable();
            let list = scenes.iter().map(u32::to_string).collect::<Vec<_>>().join(", ");
            let msg = format!("Scenes {} use identical image content ({})", list, &hash[..12]);
            warn!("{}", msg);
            msg
        })
        .collect();
    warnings.sort();
    warnings
}

/// Scratch file name for the image of the interval at `position`.
pub fn segment_file_name(scene_number: u32, position: usize, extension: &str) -> String {
    format!("scene_{:03}_{:04}.{}", scene_number, position, extension)
}

/// Write each planned segment's image into `scratch_dir`.
pub async fn materialize(
    plan: &AlignmentPlan,
    images: &[ImageAsset],
    scratch_dir: &Path,
) -> CompileResult<Vec<AlignedSegment>> {
    let mut segments = Vec::with_capacity(plan.segments.len());

    for (position, planned) in plan.segments.iter().enumerate() {
        let image = images.get(planned.asset_index).ok_or_else(|| {
            CompileError::alignment_exhausted(format!(
                "planned image #{} is not in the image list",
                planned.asset_index
            ))
        })?;

        let path: PathBuf = scratch_dir.join(segment_file_name(
            planned.interval.scene_number,
            position,
            &image.extension,
        ));

        match &image.source {
            ImageSource::Bytes(bytes) => tokio::fs::write(&path, bytes).await?,
            ImageSource::Path(source) => {
                tokio::fs::copy(source, &path).await?;
            }
        }

        segments.push(AlignedSegment {
            scene_number: planned.interval.scene_number,
            resolved_image_path: path,
            start_time: planned.interval.start_time,
            duration: planned.interval.duration,
            policy: planned.policy,
        });
    }

    Ok(segments)
}

/// Plan and materialize in one call.
pub async fn align(
    timings: &[TimingInterval],
    images: &[ImageAsset],
    scratch_dir: &Path,
) -> CompileResult<(Vec<AlignedSegment>, Vec<String>)> {
    let plan = plan_alignment(timings, images)?;
    let segments = materialize(&plan, images, scratch_dir).await?;

    info!(
        "Aligned {} segments ({} fallbacks)",
        segments.len(),
        plan.fallback_count()
    );
    Ok((segments, plan.warnings))
}
