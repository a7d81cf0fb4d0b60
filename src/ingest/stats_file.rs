//! Tab-separated observation files, one `path gid uid type size` record per
//! line. Paths containing tabs, quotes or newlines are quoted by the writer.

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, WriterBuilder};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{FileObservation, FileType};

type StatsRecord = (String, u32, u32, String, u64);

const FIELDS: usize = 5;

pub struct StatsReader<R: Read> {
    records: StringRecordsIntoIter<R>,
}

impl StatsReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> StatsReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .from_reader(reader);
        Self {
            records: reader.into_records(),
        }
    }
}

impl<R: Read> Iterator for StatsReader<R> {
    type Item = Result<FileObservation>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.records.next()? {
            Ok(record) => Some(parse_record(&record)),
            Err(err) => Some(Err(match err.position() {
                Some(pos) => Error::Parse {
                    line: pos.line(),
                    details: err.to_string(),
                },
                None => Error::Csv(err),
            })),
        }
    }
}

fn parse_record(record: &StringRecord) -> Result<FileObservation> {
    let line = record.position().map(|pos| pos.line()).unwrap_or(0);
    let parse_err = |details: String| Error::Parse { line, details };

    if record.len() != FIELDS {
        return Err(parse_err(format!(
            "expected {} fields, found {}",
            FIELDS,
            record.len()
        )));
    }

    let (path, gid, uid, file_type, size): StatsRecord = record
        .deserialize(None)
        .map_err(|e| parse_err(e.to_string()))?;
    let file_type = file_type
        .parse::<FileType>()
        .map_err(|e| parse_err(e.to_string()))?;

    Ok(FileObservation {
        path,
        gid,
        uid,
        file_type,
        size,
    })
}

pub struct StatsWriter<W: Write> {
    writer: csv::Writer<W>,
    written: u64,
}

impl StatsWriter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> StatsWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        let writer = WriterBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .from_writer(writer);
        Self { writer, written: 0 }
    }

    pub fn write(&mut self, obs: &FileObservation) -> Result<()> {
        self.writer.serialize((
            &obs.path,
            obs.gid,
            obs.uid,
            obs.file_type.as_str(),
            obs.size,
        ))?;
        self.written += 1;
        Ok(())
    }

    /// Flush and return how many records were written.
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.written)
    }
}

/// Spreads observations round-robin over `walk.0` .. `walk.<jobs-1>` in one
/// directory, so a later build can fold the files in parallel.
pub struct StatsFanOut {
    writers: Vec<StatsWriter<File>>,
    paths: Vec<PathBuf>,
    next: usize,
}

impl StatsFanOut {
    pub fn create(dir: &Path, jobs: usize) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let jobs = jobs.max(1);
        let mut writers = Vec::with_capacity(jobs);
        let mut paths = Vec::with_capacity(jobs);
        for n in 0..jobs {
            let path = dir.join(format!("walk.{}", n));
            writers.push(StatsWriter::create(&path)?);
            paths.push(path);
        }

        Ok(Self {
            writers,
            paths,
            next: 0,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn write(&mut self, obs: &FileObservation) -> Result<()> {
        self.writers[self.next].write(obs)?;
        self.next = (self.next + 1) % self.writers.len();
        Ok(())
    }

    /// Flush every file and return the output paths with the total written.
    pub fn finish(self) -> Result<(Vec<PathBuf>, u64)> {
        let mut written = 0;
        for writer in self.writers {
            written += writer.finish()?;
        }
        Ok((self.paths, written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_records() {
        let input = "/a/b/f1\t1\t100\tregular\t10\n/a/b\t1\t100\tdirectory\t4096\n";
        let observations: Vec<FileObservation> = StatsReader::from_reader(input.as_bytes())
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            observations,
            vec![
                FileObservation::new("/a/b/f1", 1, 100, FileType::Regular, 10),
                FileObservation::new("/a/b", 1, 100, FileType::Directory, 4096),
            ]
        );
    }

    #[test]
    fn test_bad_record_reports_its_line() {
        let input = "/a/f1\t1\t2\tregular\t10\n/a/f2\t1\t2\tbam\t5\n";
        let mut reader = StatsReader::from_reader(input.as_bytes());

        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_record_is_rejected() {
        let input = "/a/f1\t1\tregular\t10\n";
        let result = StatsReader::from_reader(input.as_bytes()).next().unwrap();
        assert!(matches!(result, Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn test_extra_columns_are_rejected() {
        let input = "/a/f1\t1\t2\tregular\t10\tsurplus\n";
        match StatsReader::from_reader(input.as_bytes()).next().unwrap() {
            Err(Error::Parse { line, details }) => {
                assert_eq!(line, 1);
                assert!(details.contains("found 6"), "{}", details);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_fan_out_spreads_records_round_robin() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("walk");

        let mut fan_out = StatsFanOut::create(&out, 3).unwrap();
        for i in 0..7 {
            let path = format!("/data/f{}", i);
            fan_out
                .write(&FileObservation::new(&path, 1, 1, FileType::Regular, i))
                .unwrap();
        }
        let (paths, written) = fan_out.finish().unwrap();

        assert_eq!(written, 7);
        assert_eq!(
            paths,
            vec![out.join("walk.0"), out.join("walk.1"), out.join("walk.2")]
        );

        let sizes: Vec<Vec<u64>> = paths
            .iter()
            .map(|p| {
                StatsReader::open(p)
                    .unwrap()
                    .map(|obs| obs.unwrap().size)
                    .collect()
            })
            .collect();
        assert_eq!(sizes, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn test_fan_out_needs_at_least_one_file() {
        let tmp = tempfile::tempdir().unwrap();
        let fan_out = StatsFanOut::create(tmp.path(), 0).unwrap();
        assert_eq!(fan_out.paths(), [tmp.path().join("walk.0")]);
    }

    #[test]
    fn test_awkward_paths_survive_writing() {
        let obs = FileObservation::new("/data/tab\there/\"quoted\"", 5, 6, FileType::Regular, 1);

        let mut bytes = Vec::new();
        let mut writer = StatsWriter::from_writer(&mut bytes);
        writer.write(&obs).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);

        let read_back: Vec<FileObservation> = StatsReader::from_reader(bytes.as_slice())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(read_back, vec![obs]);
    }
}
