use std::{collections::BTreeMap, path::Path};

use exr::prelude::{
    AnyChannel, AnyChannels, FlatSamples, Image, ReadChannels as _, ReadLayers as _,
    WritableImage as _, read,
};
use ndarray::Array2;

use crate::error::{StageError, StageResult};

/// A multi-channel floating-point image: channel name -> H×W array.
///
/// Channels beyond plain `R`/`G`/`B`/`A` use the renderer's compound naming
/// convention, `<pass>.<letter>` (e.g. `diffuse_color.R`). Every channel in a
/// container shares one spatial shape; that is enforced at construction.
#[derive(Clone, Debug)]
pub struct ChannelContainer {
    height: usize,
    width: usize,
    channels: BTreeMap<String, Array2<f32>>,
}

impl ChannelContainer {
    /// Builds a container from named channels, validating the shared shape.
    pub fn from_channels(
        channels: impl IntoIterator<Item = (String, Array2<f32>)>,
    ) -> StageResult<Self> {
        let mut map = BTreeMap::new();
        let mut shape: Option<(usize, usize)> = None;

        for (name, arr) in channels {
            let dim = arr.dim();
            match shape {
                None => shape = Some(dim),
                Some(expected) if expected != dim => {
                    return Err(StageError::validation(format!(
                        "channel '{name}' has shape {}x{}, expected {}x{}",
                        dim.0, dim.1, expected.0, expected.1
                    )));
                }
                Some(_) => {}
            }
            if map.insert(name.clone(), arr).is_some() {
                return Err(StageError::validation(format!("duplicate channel '{name}'")));
            }
        }

        let (height, width) =
            shape.ok_or_else(|| StageError::validation("container has no channels"))?;

        Ok(Self {
            height,
            width,
            channels: map,
        })
    }

    /// Decodes all channels of the first valid layer of an EXR file.
    pub fn from_exr_file(path: impl AsRef<Path>) -> StageResult<Self> {
        let path = path.as_ref();
        let image = read()
            .no_deep_data()
            .largest_resolution_level()
            .all_channels()
            .first_valid_layer()
            .all_attributes()
            .from_file(path)
            .map_err(|e| {
                StageError::decode(format!("read exr '{}': {e}", path.display()))
            })?;

        let size = image.layer_data.size;
        let (width, height) = (size.0, size.1);

        let mut channels = Vec::new();
        for channel in &image.layer_data.channel_data.list {
            let values: Vec<f32> = channel.sample_data.values_as_f32().collect();
            let arr = Array2::from_shape_vec((height, width), values).map_err(|e| {
                StageError::decode(format!(
                    "channel '{}' of '{}' does not fill {height}x{width}: {e}",
                    channel.name,
                    path.display()
                ))
            })?;
            channels.push((channel.name.to_string(), arr));
        }

        Self::from_channels(channels)
    }

    /// Writes the container as a single-layer EXR with one f32 sample per
    /// channel, preserving channel names.
    pub fn write_exr(&self, path: impl AsRef<Path>) -> StageResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            use anyhow::Context as _;
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output directory '{}'", parent.display()))?;
        }

        let list = self
            .channels
            .iter()
            .map(|(name, arr)| {
                AnyChannel::new(
                    name.as_str(),
                    FlatSamples::F32(arr.iter().copied().collect()),
                )
            })
            .collect();

        let image = Image::from_channels((self.width, self.height), AnyChannels::sort(list));
        image.write().to_file(path).map_err(|e| {
            StageError::encode(format!("write exr '{}': {e}", path.display()))
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn channel(&self, name: &str) -> StageResult<&Array2<f32>> {
        self.channels.get(name).ok_or_else(|| {
            StageError::validation(format!(
                "missing channel '{name}' (available: {})",
                self.channel_names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Returns the shared value of the `R`/`G`/`B` channels, which must be
    /// pixel-identical (the convention for depth and alpha maps, where one
    /// scalar is replicated across three channels).
    pub fn identical_rgb(&self, what: &str) -> StageResult<Array2<f32>> {
        let r = self.channel("R")?;
        let g = self.channel("G")?;
        let b = self.channel("B")?;
        if r != g || g != b {
            return Err(StageError::precondition(format!(
                "a valid {what} map must have all three channels the same"
            )));
        }
        Ok(r.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn chan(name: &str, arr: Array2<f32>) -> (String, Array2<f32>) {
        (name.to_string(), arr)
    }

    #[test]
    fn from_channels_validates_shared_shape() {
        let ok = ChannelContainer::from_channels([
            chan("R", Array2::zeros((2, 3))),
            chan("G", Array2::zeros((2, 3))),
        ])
        .unwrap();
        assert_eq!((ok.height(), ok.width()), (2, 3));

        let err = ChannelContainer::from_channels([
            chan("R", Array2::zeros((2, 3))),
            chan("G", Array2::zeros((3, 2))),
        ]);
        assert!(matches!(err, Err(StageError::Validation(_))));
    }

    #[test]
    fn empty_container_is_rejected() {
        let none: Vec<(String, Array2<f32>)> = Vec::new();
        assert!(ChannelContainer::from_channels(none).is_err());
    }

    #[test]
    fn missing_channel_lists_available_names() {
        let c = ChannelContainer::from_channels([chan("R", Array2::zeros((1, 1)))]).unwrap();
        let err = c.channel("A").unwrap_err();
        assert!(err.to_string().contains("missing channel 'A'"));
        assert!(err.to_string().contains("R"));
    }

    #[test]
    fn identical_rgb_accepts_replicated_and_rejects_mismatch() {
        let v = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]);
        let c = ChannelContainer::from_channels([
            chan("R", v.clone()),
            chan("G", v.clone()),
            chan("B", v.clone()),
        ])
        .unwrap();
        assert_eq!(c.identical_rgb("depth").unwrap(), v);

        let c = ChannelContainer::from_channels([
            chan("R", v.clone()),
            chan("G", v.clone()),
            chan("B", v + 0.5),
        ])
        .unwrap();
        assert!(matches!(
            c.identical_rgb("depth"),
            Err(StageError::Precondition(_))
        ));
    }

    #[test]
    fn exr_round_trip_preserves_named_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passes.exr");

        let r = arr2(&[[0.25f32, 0.5], [0.75, 1.0]]);
        let a = arr2(&[[1.0f32, 1.0], [0.0, 1.0]]);
        let c = ChannelContainer::from_channels([
            chan("diffuse_color.R", r.clone()),
            chan("diffuse_color.A", a.clone()),
        ])
        .unwrap();

        c.write_exr(&path).unwrap();
        let back = ChannelContainer::from_exr_file(&path).unwrap();

        assert_eq!(back.channel("diffuse_color.R").unwrap(), &r);
        assert_eq!(back.channel("diffuse_color.A").unwrap(), &a);
    }
}
