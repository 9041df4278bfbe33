//! Upload of staged pages to the live site, and the local copies that go with it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, info, warn};

use crate::fsio;
use crate::settings::{FtpSettings, Settings};

/// Destination for uploaded pages. One value is one session.
pub trait Uploader {
    fn put(&mut self, name: &str, file: &mut File) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

pub struct FtpUploader {
    stream: FtpStream,
}

impl FtpUploader {
    /// Log in and enter the remote directory, creating it level by level when
    /// needed. When that fails too, uploads go to the login directory.
    pub fn connect(ftp: &FtpSettings) -> Result<Self> {
        let password = ftp
            .password
            .as_deref()
            .context("ftp.password is not set (use BLOG_FTP__PASSWORD)")?;
        let address = format!("{}:{}", ftp.host, ftp.port);
        let mut stream = FtpStream::connect(&address)
            .with_context(|| format!("Failed to connect to {}", address))?;
        stream
            .login(ftp.user.as_str(), password)
            .with_context(|| format!("Login failed for {}", ftp.user))?;
        stream
            .transfer_type(FileType::Binary)
            .context("Failed to switch to binary mode")?;
        info!("Connected to {} as {}", ftp.host, ftp.user);

        if stream.cwd(&ftp.remote_dir).is_ok() {
            debug!(dir = %ftp.remote_dir, "entered remote directory");
        } else {
            warn!("Cannot enter {}, creating it", ftp.remote_dir);
            match create_remote_dir(&mut stream, &ftp.remote_dir) {
                Ok(dir) => info!("Remote directory: {}", dir),
                Err(e) => warn!("Could not create {} ({}), uploading into the current directory", ftp.remote_dir, e),
            }
        }
        Ok(FtpUploader { stream })
    }
}

fn create_remote_dir(stream: &mut FtpStream, dir: &str) -> Result<String, FtpError> {
    let mut current = String::from("/");
    for part in dir.split('/').filter(|p| !p.is_empty()) {
        current.push_str(part);
        current.push('/');
        if stream.cwd(&current).is_err() {
            stream.mkdir(&current)?;
            stream.cwd(&current)?;
            debug!(dir = %current, "created");
        }
    }
    stream.pwd()
}

impl Uploader for FtpUploader {
    fn put(&mut self, name: &str, file: &mut File) -> Result<()> {
        let bytes = self
            .stream
            .put_file(name, file)
            .with_context(|| format!("Upload of {} failed", name))?;
        debug!(file = %name, bytes, "uploaded");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.stream.quit().context("FTP quit failed")
    }
}

#[derive(Debug, Default)]
pub struct TransferReport {
    pub processed: usize,
    pub uploaded: usize,
    pub copied: usize,
    pub errors: Vec<(String, String)>,
}

impl TransferReport {
    pub fn print(&self) {
        println!("Files processed:     {}", self.processed);
        println!("Uploaded:            {}", self.uploaded);
        println!("Copied locally:      {}", self.copied);
        println!("Errors:              {}", self.errors.len());
        for (name, error) in &self.errors {
            println!("  {}: {}", name, error);
        }
    }
}

fn progress(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Upload `files` through `uploader`, copying each into `mirror` when given.
/// A failed file is recorded and the rest continue.
pub fn upload_all(
    files: &[PathBuf],
    uploader: &mut dyn Uploader,
    mirror: Option<&Path>,
) -> Result<TransferReport> {
    let mut report = TransferReport::default();
    if let Some(dir) = mirror {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let pb = progress(files.len())?;

    for path in files {
        let name = fsio::file_name(path);
        pb.set_message(name.clone());
        report.processed += 1;

        let sent = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))
            .and_then(|mut file| uploader.put(&name, &mut file));
        match sent {
            Ok(()) => report.uploaded += 1,
            Err(e) => {
                warn!("{}: {:#}", name, e);
                report.errors.push((name.clone(), format!("{:#}", e)));
            }
        }

        if let Some(dir) = mirror {
            match fsio::copy_into(path, dir) {
                Ok(_) => report.copied += 1,
                Err(e) => {
                    warn!("{}: {:#}", name, e);
                    report.errors.push((name.clone(), format!("{:#}", e)));
                }
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(report)
}

/// Upload every HTML file of `source` to the site in one FTP session.
pub fn upload(settings: &Settings, source: &Path, dry_run: bool) -> Result<TransferReport> {
    let files = fsio::list_html(source)?;
    info!("{} files to upload from {}", files.len(), source.display());
    if dry_run {
        for path in &files {
            debug!(file = %path.display(), "would upload");
        }
        return Ok(TransferReport {
            processed: files.len(),
            ..Default::default()
        });
    }

    let mut uploader = FtpUploader::connect(&settings.ftp)?;
    let report = upload_all(&files, &mut uploader, settings.mirror_dir.as_deref())?;
    if let Err(e) = uploader.finish() {
        warn!("{:#}", e);
    }
    Ok(report)
}

/// Copy freshly converted pages from `output_dir` into `en_dir`, overwriting.
pub fn stage(settings: &Settings, dry_run: bool) -> Result<TransferReport> {
    if !settings.en_dir.is_dir() {
        anyhow::bail!("Target folder does not exist: {}", settings.en_dir.display());
    }
    let files = fsio::list_html(&settings.output_dir)?;
    let mut report = TransferReport::default();
    for path in &files {
        let name = fsio::file_name(path);
        report.processed += 1;
        if settings.en_dir.join(&name).exists() {
            debug!(file = %name, "overwriting");
        }
        if dry_run {
            continue;
        }
        match fsio::copy_into(path, &settings.en_dir) {
            Ok(_) => report.copied += 1,
            Err(e) => {
                warn!("{}: {:#}", name, e);
                report.errors.push((name, format!("{:#}", e)));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[derive(Default)]
    struct Recorder {
        received: Vec<(String, String)>,
        reject: Option<&'static str>,
        finished: bool,
    }

    impl Uploader for Recorder {
        fn put(&mut self, name: &str, file: &mut File) -> Result<()> {
            if self.reject == Some(name) {
                anyhow::bail!("550 permission denied");
            }
            let mut body = String::new();
            file.read_to_string(&mut body)?;
            self.received.push((name.to_string(), body));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn uploads_and_mirrors() {
        let source = tempfile::tempdir().unwrap();
        let mirror = tempfile::tempdir().unwrap();
        let mirror_dir = mirror.path().join("en");
        fs::write(source.path().join("a.html"), "<p>a</p>").unwrap();
        fs::write(source.path().join("b.html"), "<p>b</p>").unwrap();
        let files = fsio::list_html(source.path()).unwrap();

        let mut recorder = Recorder {
            reject: Some("b.html"),
            ..Default::default()
        };
        let report = upload_all(&files, &mut recorder, Some(&mirror_dir)).unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.copied, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, "b.html");
        assert_eq!(recorder.received, vec![("a.html".to_string(), "<p>a</p>".to_string())]);
        assert!(mirror_dir.join("b.html").is_file());
    }

    #[test]
    fn upload_needs_a_password() {
        let source = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.html"), "<p>a</p>").unwrap();
        let settings = Settings::default();

        // a dry run never connects
        let report = upload(&settings, source.path(), true).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.uploaded, 0);

        let err = upload(&settings, source.path(), false).unwrap_err();
        assert!(err.to_string().contains("ftp.password"));
    }

    #[test]
    fn stage_copies_output_into_en() {
        let output = tempfile::tempdir().unwrap();
        let en = tempfile::tempdir().unwrap();
        fs::write(output.path().join("new.html"), "new").unwrap();
        fs::write(output.path().join("old.html"), "fresh").unwrap();
        fs::write(output.path().join("notes.txt"), "skip").unwrap();
        fs::write(en.path().join("old.html"), "stale").unwrap();
        let settings = Settings {
            output_dir: output.path().to_path_buf(),
            en_dir: en.path().to_path_buf(),
            ..Settings::default()
        };

        let report = stage(&settings, true).unwrap();
        assert_eq!((report.processed, report.copied), (2, 0));
        assert_eq!(fs::read_to_string(en.path().join("old.html")).unwrap(), "stale");

        let report = stage(&settings, false).unwrap();
        assert_eq!((report.processed, report.copied), (2, 2));
        assert_eq!(fs::read_to_string(en.path().join("old.html")).unwrap(), "fresh");
        assert!(!en.path().join("notes.txt").exists());
    }
}
