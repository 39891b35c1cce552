//! Frame discovery and grouping by instrument configuration.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use regex::Regex;

use crate::fits::FitsError;
use crate::frame::Frame;

/// Header keywords collected for every frame.
pub const KEYWORDS: [&str; 18] = [
    "DATE", "DATE-OBS", "INSTCONF", "FOCUS", "CAM_TARG", "GRT_TARG", "CAM_FOC", "COLL_FOC",
    "FILTER", "FILTER2", "GRATING", "SLIT", "WAVMODE", "EXPTIME", "RDNOISE", "GAIN", "OBSTYPE",
    "ROI",
];

/// Keywords whose exact equality defines a configuration group.
pub const GROUP_KEYWORDS: [&str; 10] = [
    "CAM_TARG", "GRT_TARG", "FILTER", "FILTER2", "GRATING", "SLIT", "WAVMODE", "RDNOISE", "GAIN",
    "ROI",
];

#[derive(thiserror::Error, Debug)]
pub enum CollectionError {
    #[error("no such directory: {0}")]
    NoSuchDirectory(PathBuf),
    #[error("directory {0} is empty")]
    EmptyDirectory(PathBuf),
    #[error("directory {path} does not contain files matching the pattern {pattern}")]
    NoMatchingFiles { path: PathBuf, pattern: String },
    #[error("focus frames must have the OBSTYPE keyword equal to {0:?}, none found")]
    NoFocusFrames(String),
    #[error("invalid file pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list the data directory")]
    Io(#[from] std::io::Error),
    #[error("failed to read a frame")]
    Fits(#[from] FitsError),
}

/// The frames sharing one instrument configuration, with the mode name
/// derived from their headers.
#[derive(Debug)]
pub struct FocusGroup {
    pub mode_name: String,
    pub frames: Vec<Frame>,
}

/// Builder that discovers FITS frames under a directory and partitions them
/// into configuration groups.
pub struct FrameCollector {
    data_path: PathBuf,
    file_pattern: String,
    obstype: String,
}

impl Default for FrameCollector {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            file_pattern: String::from("*.fits"),
            obstype: String::from("FOCUS"),
        }
    }
}

impl FrameCollector {
    pub fn data_path<P: AsRef<Path>>(self, data_path: P) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn file_pattern<S: Into<String>>(self, file_pattern: S) -> Self {
        Self {
            file_pattern: file_pattern.into(),
            ..self
        }
    }
    pub fn obstype<S: Into<String>>(self, obstype: S) -> Self {
        Self {
            obstype: obstype.into(),
            ..self
        }
    }

    /// Discover, filter and group the frames.
    pub fn collect(self) -> Result<Vec<FocusGroup>, CollectionError> {
        if !self.data_path.is_dir() {
            return Err(CollectionError::NoSuchDirectory(self.data_path));
        }
        if self.data_path.read_dir()?.next().is_none() {
            return Err(CollectionError::EmptyDirectory(self.data_path));
        }
        let pattern = self.data_path.join(&self.file_pattern);
        let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(Result::ok)
            .collect();
        if paths.is_empty() {
            return Err(CollectionError::NoMatchingFiles {
                path: self.data_path,
                pattern: self.file_pattern,
            });
        }
        paths.sort();
        log::debug!("found {} files matching {}", paths.len(), self.file_pattern);

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            frames.push(Frame::read(path)?);
        }
        let focus_frames: Vec<Frame> = frames
            .into_iter()
            .filter(|f| f.header().str_value("OBSTYPE") == Some(self.obstype.as_str()))
            .collect();
        if focus_frames.is_empty() {
            return Err(CollectionError::NoFocusFrames(self.obstype));
        }
        log::debug!(
            "found {} frames with OBSTYPE = {}",
            focus_frames.len(),
            self.obstype
        );

        let groups = focus_frames
            .into_iter()
            .into_group_map_by(|frame| configuration_key(frame))
            .into_iter()
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, frames)| FocusGroup {
                mode_name: mode_name(&frames[0]),
                frames,
            })
            .collect();
        Ok(groups)
    }
}

fn configuration_key(frame: &Frame) -> Vec<String> {
    GROUP_KEYWORDS
        .iter()
        .map(|key| {
            frame
                .header()
                .get(key)
                .map(|v| v.to_string())
                .unwrap_or_default()
        })
        .collect()
}

/// A string unique to the observing mode of a group.
///
/// Imaging: `IM__{INSTCONF}__{FILTER}`; spectroscopy:
/// `SP__{INSTCONF}__{WAVMODE}__{FILTER2}`. Angle brackets and blanks are
/// stripped from the result.
pub fn mode_name(frame: &Frame) -> String {
    let header = frame.header();
    let value = |key: &str| header.str_value(key).unwrap_or_default().to_owned();
    let name = if value("WAVMODE") == "IMAGING" {
        ["IM".to_owned(), value("INSTCONF"), value("FILTER")].join("__")
    } else {
        [
            "SP".to_owned(),
            value("INSTCONF"),
            value("WAVMODE"),
            value("FILTER2"),
        ]
        .join("__")
    };
    let unwanted = Regex::new("[<> ]").unwrap();
    unwanted.replace_all(&name, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::Header;

    fn frame_with(cards: &[(&str, &str)]) -> Frame {
        let mut header = Header::new();
        for (key, value) in cards {
            header.set(key, *value);
        }
        Frame::new("test.fits", vec![0.0; 4], 2, 2).with_header(header)
    }

    #[test]
    fn imaging_mode_name() {
        let frame = frame_with(&[
            ("INSTCONF", "Blue"),
            ("FILTER", "FILTER-X"),
            ("FILTER2", "NO FILTER"),
            ("WAVMODE", "IMAGING"),
        ]);
        assert_eq!(mode_name(&frame), "IM__Blue__FILTER-X");
    }

    #[test]
    fn spectroscopy_mode_name() {
        let frame = frame_with(&[
            ("INSTCONF", "Blue"),
            ("FILTER", "FILTER-X"),
            ("FILTER2", "NO FILTER"),
            ("WAVMODE", "400  z1"),
        ]);
        assert_eq!(mode_name(&frame), "SP__Blue__400z1__NOFILTER");
    }

    #[test]
    fn frames_group_by_configuration() {
        let a1 = frame_with(&[("OBSTYPE", "FOCUS"), ("GRATING", "400"), ("SLIT", "1.0")]);
        let a2 = frame_with(&[("OBSTYPE", "FOCUS"), ("GRATING", "400"), ("SLIT", "1.0")]);
        let b = frame_with(&[("OBSTYPE", "FOCUS"), ("GRATING", "600"), ("SLIT", "1.0")]);
        assert_eq!(configuration_key(&a1), configuration_key(&a2));
        assert_ne!(configuration_key(&a1), configuration_key(&b));
    }

    #[test]
    fn discovers_and_groups_frames_on_disk() {
        let dir = std::env::temp_dir().join(format!("focus-finder-seq-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (i, grating) in [(1, "400"), (2, "400"), (3, "600")] {
            let mut header = Header::new();
            header.set("OBSTYPE", "FOCUS");
            header.set("CAM_FOC", -500.0 + 100.0 * i as f64);
            header.set("GRATING", grating);
            header.set("INSTCONF", "Red");
            header.set("WAVMODE", "400m2");
            header.set("FILTER2", "NO FILTER");
            crate::fits::write_primary(
                dir.join(format!("seq_{}.fits", i)),
                &header,
                4,
                8,
                &vec![1.0; 32],
            )
            .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let groups = FrameCollector::default().data_path(&dir).collect().unwrap();
        assert_eq!(groups.len(), 2);
        let sizes: Vec<usize> = groups.iter().map(|g| g.frames.len()).collect();
        assert!(sizes.contains(&2) && sizes.contains(&1));
        for group in &groups {
            assert_eq!(group.mode_name, "SP__Red__400m2__NOFILTER");
        }
    }

    #[test]
    fn missing_directory_is_an_error() {
        let result = FrameCollector::default()
            .data_path("/definitely/not/a/directory")
            .collect();
        assert!(matches!(result, Err(CollectionError::NoSuchDirectory(_))));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = std::env::temp_dir().join(format!("focus-finder-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let result = FrameCollector::default().data_path(&dir).collect();
        assert!(matches!(result, Err(CollectionError::EmptyDirectory(_))));
    }

    #[test]
    fn non_matching_files_are_an_error() {
        let dir =
            std::env::temp_dir().join(format!("focus-finder-nomatch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("sample_file.txt"), b"not a frame").unwrap();
        let result = FrameCollector::default().data_path(&dir).collect();
        assert!(matches!(
            result,
            Err(CollectionError::NoMatchingFiles { .. })
        ));
    }
}
