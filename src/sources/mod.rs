//! Source acquisition.
//!
//! Sources are responsible for fetching plugin sources from various
//! locations (release tarballs over HTTP, git repositories).

pub mod download;
pub mod git;

pub use download::{filename_from_url, Downloader, HttpDownloader};
pub use git::{GitClient, VcsClient};
