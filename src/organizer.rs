use crate::candidates::list_candidates;
use crate::counter::{Counter, Counters};
use crate::date;
use anyhow::{Context, Result};
use filetime::FileTime;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// What happened to a single candidate.
#[derive(Debug)]
pub enum Outcome {
    Moved { folder: String, destination: PathBuf },
    SkippedNoDate,
    MoveFailed(io::Error),
}

pub struct Organizer<'a> {
    pub counter: Counter,
    pub source: &'a Path,
    pub output: &'a Path,
    exclude: Option<PathBuf>,
    show_progress: bool,
}

impl<'a> Organizer<'a> {
    pub fn new(source: &'a Path, output: &'a Path) -> Self {
        Self {
            counter: Counter::default(),
            source,
            output,
            exclude: None,
            show_progress: true,
        }
    }

    /// Never treat `path` as a candidate, typically the running executable.
    pub fn exclude(mut self, path: PathBuf) -> Self {
        self.exclude = Some(path);
        self
    }

    pub fn hide_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Organizes every candidate of the source directory. Per-file move
    /// failures are reported and skipped; failing to create a folder aborts.
    pub fn run(&mut self) -> Result<Vec<(PathBuf, Outcome)>> {
        println!("Source folder: '{}'", self.source.display());
        println!("Files will be moved to: '{}'", self.output.display());
        println!("{}", "-".repeat(50));

        let candidates = list_candidates(self.source, self.exclude.as_deref())?;

        if candidates.is_empty() {
            println!(
                "No supported media files found in '{}'.",
                self.source.display()
            );
            return Ok(vec![]);
        }

        fs::create_dir_all(self.output)
            .with_context(|| format!("Cannot create {}", self.output.display()))?;

        self.organize_all(candidates)
    }

    /// Moves each of `candidates` in order, printing one status line per file
    /// and the summary at the end.
    pub fn organize_all(&mut self, candidates: Vec<PathBuf>) -> Result<Vec<(PathBuf, Outcome)>> {
        println!("Organizing {} files...", candidates.len());

        let progress = if self.show_progress {
            ProgressBar::new(candidates.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_style(ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )?);

        let mut outcomes = Vec::with_capacity(candidates.len());

        for path in candidates {
            let name = display_name(&path);
            progress.set_message(name.clone());
            self.counter.increment(Counters::Candidates);

            let outcome = self.organize_file(&path)?;

            let line = match &outcome {
                Outcome::Moved { folder, .. } => {
                    self.counter.increment(Counters::Moved);
                    format!("  [OK] '{name}' moved to '{folder}'")
                }
                Outcome::SkippedNoDate => {
                    self.counter.increment(Counters::Skipped);
                    format!("  [WARNING] Cannot determine a date for '{name}'. Skipped.")
                }
                Outcome::MoveFailed(e) => {
                    self.counter.increment(Counters::Failed);
                    format!("  [ERROR] Cannot move '{name}': {e}")
                }
            };
            progress.suspend(|| println!("{line}"));
            progress.inc(1);

            outcomes.push((path, outcome));
        }

        progress.set_message("Done");
        progress.finish();

        info!(
            "Organized {} candidates: {} moved, {} skipped, {} failed",
            self.counter.get(Counters::Candidates),
            self.counter.get(Counters::Moved),
            self.counter.get(Counters::Skipped),
            self.counter.get(Counters::Failed)
        );

        println!("\nOrganization complete!");
        println!("{}", self.counter);
        println!("Files were moved to '{}'.", self.output.display());

        Ok(outcomes)
    }

    /// Resolves the date of `path` and moves it into its day bucket.
    pub fn organize_file(&self, path: &Path) -> Result<Outcome> {
        let resolved = match date::resolve(path) {
            Some(resolved) => resolved,
            None => {
                debug!("No date for {}, leaving it in place", path.display());
                return Ok(Outcome::SkippedNoDate);
            }
        };

        let folder = resolved.folder_name();
        let target_dir = self.output.join(&folder);
        fs::create_dir_all(&target_dir)
            .with_context(|| format!("Cannot create {}", target_dir.display()))?;

        let destination = match path.file_name() {
            Some(name) => target_dir.join(name),
            None => {
                return Ok(Outcome::MoveFailed(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path has no file name",
                )))
            }
        };

        debug!(
            "{} ({:?}) -> {}",
            path.display(),
            resolved.source,
            destination.display()
        );

        Ok(match move_file(path, &destination) {
            Ok(()) => Outcome::Moved {
                folder,
                destination,
            },
            Err(e) => Outcome::MoveFailed(e),
        })
    }
}

/// Renames `src` to `dst`, copying then removing when they sit on different
/// filesystems. Refuses to replace an existing `dst`.
fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    if fs::symlink_metadata(dst).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", dst.display()),
        ));
    }

    match fs::rename(src, dst) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(src, dst),
        other => other,
    }
}

/// Copy keeping the modification time, since it may be the only date the
/// file carries.
fn copy_then_remove(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let src_mtime = FileTime::from_last_modification_time(&fs::metadata(src)?);
    filetime::set_file_mtime(dst, src_mtime)?;
    fs::remove_file(src)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::tests::{jpeg_with_tags, set_mtime};
    use chrono::NaiveDate;
    use exif::Tag;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        source: TempDir,
        target: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                source: TempDir::new().unwrap(),
                target: TempDir::new().unwrap(),
            }
        }

        fn output(&self) -> PathBuf {
            self.target.path().join("FotoOrganizzate")
        }

        fn write(&self, name: &str, contents: &[u8], modified: NaiveDate) -> PathBuf {
            let path = self.source.path().join(name);
            fs::write(&path, contents).unwrap();
            set_mtime(&path, modified);
            path
        }
    }

    #[test]
    fn jpeg_goes_to_its_capture_day() {
        let fx = Fixture::new();
        let jpeg = jpeg_with_tags(&[(Tag::DateTimeOriginal, "2023:05:01 10:00:00")]);
        let src = fx.write("holiday.jpg", &jpeg, ymd(2024, 1, 1));
        let output = fx.output();

        let mut organizer = Organizer::new(fx.source.path(), &output).hide_progress();
        let outcomes = organizer.run().unwrap();

        let expected = output.join("2023-05-01").join("holiday.jpg");
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            &outcomes[0].1,
            Outcome::Moved { folder, destination } if folder == "2023-05-01" && *destination == expected
        ));
        assert!(expected.is_file());
        assert!(!src.exists());
        assert_eq!(fs::read(&expected).unwrap(), jpeg);
    }

    #[test]
    fn video_goes_to_its_modification_day() {
        let fx = Fixture::new();
        fx.write("clip.mp4", b"video", ymd(2022, 11, 3));
        let output = fx.output();

        let mut organizer = Organizer::new(fx.source.path(), &output).hide_progress();
        organizer.run().unwrap();

        assert!(output.join("2022-11-03").join("clip.mp4").is_file());
        assert_eq!(organizer.counter.get(Counters::Moved), 1);
    }

    #[test]
    fn nothing_to_do_creates_no_destination() {
        let fx = Fixture::new();
        fx.write("notes.txt", b"text", ymd(2022, 11, 3));
        let output = fx.output();

        let mut organizer = Organizer::new(fx.source.path(), &output).hide_progress();
        let outcomes = organizer.run().unwrap();

        assert!(outcomes.is_empty());
        assert!(!output.exists());
        assert!(fx.source.path().join("notes.txt").exists());
    }

    #[test]
    fn shared_day_folder_is_reused() {
        let fx = Fixture::new();
        fx.write("a.png", b"a", ymd(2021, 6, 15));
        fx.write("b.gif", b"b", ymd(2021, 6, 15));
        let output = fx.output();

        let mut organizer = Organizer::new(fx.source.path(), &output).hide_progress();
        organizer.run().unwrap();

        assert!(output.join("2021-06-15").join("a.png").is_file());
        assert!(output.join("2021-06-15").join("b.gif").is_file());
        assert_eq!(organizer.counter.get(Counters::Moved), 2);
        assert_eq!(organizer.counter.get(Counters::Failed), 0);
    }

    #[test]
    fn name_collision_fails_only_that_file() {
        let fx = Fixture::new();
        let clash = fx.write("clip.mp4", b"new", ymd(2022, 11, 3));
        fx.write("other.avi", b"other", ymd(2022, 11, 4));
        let output = fx.output();
        fs::create_dir_all(output.join("2022-11-03")).unwrap();
        fs::write(output.join("2022-11-03").join("clip.mp4"), b"old").unwrap();

        let mut organizer = Organizer::new(fx.source.path(), &output).hide_progress();
        let outcomes = organizer.run().unwrap();

        let failed = outcomes.iter().find(|(p, _)| *p == clash).unwrap();
        assert!(matches!(
            &failed.1,
            Outcome::MoveFailed(e) if e.kind() == io::ErrorKind::AlreadyExists
        ));
        assert!(clash.exists());
        assert_eq!(
            fs::read(output.join("2022-11-03").join("clip.mp4")).unwrap(),
            b"old"
        );
        assert!(output.join("2022-11-04").join("other.avi").is_file());
        assert_eq!(organizer.counter.get(Counters::Failed), 1);
        assert_eq!(organizer.counter.get(Counters::Moved), 1);
    }

    #[test]
    fn excluded_program_stays_put() {
        let fx = Fixture::new();
        let program = fx.write("organizer.mov", b"bin", ymd(2022, 1, 1));
        fx.write("clip.mov", b"clip", ymd(2022, 1, 2));
        let output = fx.output();

        let mut organizer = Organizer::new(fx.source.path(), &output)
            .exclude(program.clone())
            .hide_progress();
        organizer.run().unwrap();

        assert!(program.exists());
        assert!(output.join("2022-01-02").join("clip.mov").is_file());
        assert_eq!(organizer.counter.get(Counters::Candidates), 1);
    }

    #[test]
    fn undated_candidate_is_counted_as_skipped() {
        let fx = Fixture::new();
        fx.write("dated.mkv", b"dated", ymd(2020, 2, 29));
        let vanished = fx.source.path().join("vanished.bmp");
        let output = fx.output();
        fs::create_dir_all(&output).unwrap();

        let mut organizer = Organizer::new(fx.source.path(), &output).hide_progress();
        let outcomes = organizer
            .organize_all(vec![vanished.clone(), fx.source.path().join("dated.mkv")])
            .unwrap();

        assert!(matches!(&outcomes[0], (p, Outcome::SkippedNoDate) if *p == vanished));
        assert!(matches!(&outcomes[1].1, Outcome::Moved { folder, .. } if folder == "2020-02-29"));
        assert_eq!(organizer.counter.get(Counters::Candidates), 2);
        assert_eq!(organizer.counter.get(Counters::Skipped), 1);
        assert_eq!(organizer.counter.get(Counters::Moved), 1);
        let folders: Vec<_> = fs::read_dir(&output).unwrap().collect();
        assert_eq!(folders.len(), 1);
    }

    #[test]
    fn copy_fallback_keeps_modification_time() {
        let fx = Fixture::new();
        let src = fx.write("clip.mp4", b"video", ymd(2022, 11, 3));
        let before = FileTime::from_last_modification_time(&fs::metadata(&src).unwrap());
        let dst = fx.target.path().join("clip.mp4");

        copy_then_remove(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"video");
        let after = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(after, before);
        assert_eq!(
            crate::date::read_modified(&dst).unwrap().date(),
            ymd(2022, 11, 3)
        );
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_at_destination_is_a_collision() {
        let fx = Fixture::new();
        let src = fx.write("clip.mp4", b"video", ymd(2022, 11, 3));
        let dst = fx.target.path().join("clip.mp4");
        std::os::unix::fs::symlink(fx.target.path().join("missing"), &dst).unwrap();

        let err = move_file(&src, &dst).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(src.exists());
        assert!(fs::symlink_metadata(&dst).unwrap().file_type().is_symlink());
    }

    #[test]
    fn undated_file_is_skipped_without_a_folder() {
        let fx = Fixture::new();
        let output = fx.output();
        let organizer = Organizer::new(fx.source.path(), &output).hide_progress();

        let outcome = organizer
            .organize_file(&fx.source.path().join("vanished.jpg"))
            .unwrap();

        assert!(matches!(outcome, Outcome::SkippedNoDate));
        assert!(!output.exists());
    }
}
