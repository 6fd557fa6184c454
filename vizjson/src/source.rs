//! Visualization source handling.

use std::path::PathBuf;

use eyre::{Result, WrapErr};
use glob::Paths;

use crate::{data::load_data, Error, Visualization};

/// An iterator producing visualizations, each paired with the path from which
/// it was loaded, as they are read from a [`VisualizationSource`].
pub enum SourceIter {
    Files { paths: Paths },
}

impl Iterator for SourceIter {
    type Item = Result<(PathBuf, Visualization)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SourceIter::Files { paths } => loop {
                let next_path = match paths.next()? {
                    Ok(p) => p,
                    Err(e) => return Some(Err(Error::SourceIter(e).into())),
                };
                if !next_path.is_file() {
                    continue;
                }
                let result = load_data(&next_path)
                    .wrap_err_with(|| Error::FailedToLoadVisualization(next_path.clone()))
                    .map(|viz| (next_path, viz));
                return Some(result);
            },
        }
    }
}

/// A source of fully loaded visualizations.
#[derive(Debug)]
pub enum VisualizationSource {
    /// One or more files from the local file system.
    ///
    /// The parameter can specify a glob-style pattern for matching files.
    Files(String),
}

impl VisualizationSource {
    /// Returns an iterator that allows one to iterate through visualizations
    /// parsed from the source as they are read.
    ///
    /// Can fail if this source has been incorrectly configured.
    pub fn iter(&self) -> Result<SourceIter, Error> {
        Ok(match self {
            Self::Files(pattern) => glob::glob(pattern)
                .map(|paths| SourceIter::Files { paths })
                .map_err(|e| Error::SourceFilePattern(pattern.clone(), e))?,
        })
    }
}
