use std::error::Error;
use std::io::{BufRead, Lines};

use crate::buckets::bucket_of;
use crate::topic_index::TopicIndex;

/// Every tweet record is framed as one header line plus exactly this many
/// continuation lines of engagement history, whether or not the record is
/// kept.
pub const HISTORY_LINES: usize = 8;

// Token substitutions applied to each raw line before it is split. The
// multi-word topic labels must be collapsed before whitespace splitting,
// so they come first.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("Human Interest", "Human_Interest"),
    ("Social Issues", "Social_Issues"),
    ("true", "1"),
    ("false", "0"),
    ("pos", "2"),
    ("neu", "1"),
    ("neg", "0"),
];

/// Applies the label-normalization substitutions to one raw sample line.
pub fn normalize_line(line: &str) -> String {
    let mut normalized = line.to_owned();
    for &(from, to) in REPLACEMENTS {
        normalized = normalized.replace(from, to);
    }
    normalized
}

/// One tweet reconstructed from a 1+8 line record block.
///
/// `history` holds one row per continuation line, each trimmed to the
/// `minimumPeriods - 1` leading observations the configured resolution
/// uses.
#[derive(Debug, Clone)]
pub struct TweetRecord {
    pub retweets: f64,
    pub followers: f64,
    pub flags: [f64; 8],
    pub sentiment: i64,
    pub topic: String,
    pub periods: u32,
    pub history: Vec<Vec<f64>>,
}

/// The outcome of consuming one complete record block from the stream.
pub enum Block {
    Kept(TweetRecord),
    BelowThreshold,
}

const FLAG_FIELDS: [&str; 8] = [
    "isDirect",
    "isMention",
    "hasExclamation",
    "hasHashtag",
    "hasEmoticonNegative",
    "hasEmoticonPositive",
    "hasQuestion",
    "hasURL",
];

// Header token positions: [0] retweet count, [3] follower count,
// [4..12) flags, [12] sentiment, [13] topic, [last] observed periods.
const MIN_HEADER_FIELDS: usize = 15;

fn parse_number(token: &str, field: &str, line_no: usize) -> Result<f64, Box<dyn Error>> {
    token
        .parse()
        .map_err(|_| format!("line {}: {} is not a number: '{}'", line_no, field, token).into())
}

/// Reads tweet records from a sample file.
///
/// Each call to `next` consumes one whole 1+8 line block, so records below
/// the period threshold still advance the stream past their continuation
/// lines and the next header is always read from the right position.
pub struct SampleReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    minimum_periods: u32,
}

impl<R: BufRead> SampleReader<R> {
    pub fn new(input: R, minimum_periods: u32) -> SampleReader<R> {
        SampleReader {
            lines: input.lines(),
            line_no: 0,
            minimum_periods,
        }
    }

    fn next_line(&mut self) -> Option<Result<String, Box<dyn Error>>> {
        match self.lines.next() {
            None => None,
            Some(Err(err)) => Some(Err(err.into())),
            Some(Ok(line)) => {
                self.line_no += 1;
                Some(Ok(line))
            }
        }
    }

    // Consumes one continuation line, failing if the file ends inside the
    // block.
    fn continuation_line(&mut self, record_line: usize) -> Result<String, Box<dyn Error>> {
        match self.next_line() {
            None => Err(format!(
                "record at line {}: file ends before its {} history lines",
                record_line, HISTORY_LINES
            )
            .into()),
            Some(line) => line,
        }
    }

    fn read_block(&mut self) -> Option<Result<Block, Box<dyn Error>>> {
        let header = match self.next_line()? {
            Ok(line) => line,
            Err(err) => return Some(Err(err)),
        };
        let record_line = self.line_no;
        Some(self.parse_block(&header, record_line))
    }

    fn parse_block(&mut self, header: &str, record_line: usize) -> Result<Block, Box<dyn Error>> {
        let normalized = normalize_line(header);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.len() < MIN_HEADER_FIELDS {
            return Err(format!(
                "line {}: header has {} fields, expected at least {}",
                record_line,
                tokens.len(),
                MIN_HEADER_FIELDS
            )
            .into());
        }

        let periods: u32 = tokens[tokens.len() - 1].parse().map_err(|_| {
            format!(
                "line {}: observed period count is not an integer: '{}'",
                record_line,
                tokens[tokens.len() - 1]
            )
        })?;

        if periods < self.minimum_periods {
            // Not enough observed history for this resolution. The record's
            // continuation lines still have to be consumed to keep the
            // stream aligned on the next header.
            for _ in 0..HISTORY_LINES {
                self.continuation_line(record_line)?;
            }
            return Ok(Block::BelowThreshold);
        }

        let retweets = parse_number(tokens[0], "retweet count", record_line)?;
        let followers = parse_number(tokens[3], "follower count", record_line)?;
        let mut flags = [0.0; 8];
        for (i, flag) in flags.iter_mut().enumerate() {
            *flag = parse_number(tokens[4 + i], FLAG_FIELDS[i], record_line)?;
        }
        let sentiment: i64 = tokens[12].parse().map_err(|_| {
            format!(
                "line {}: sentiment category is not an integer: '{}'",
                record_line, tokens[12]
            )
        })?;
        let topic = tokens[13].to_owned();

        let wanted = self.minimum_periods.saturating_sub(1) as usize;
        let mut history = Vec::with_capacity(HISTORY_LINES);
        for _ in 0..HISTORY_LINES {
            let line = self.continuation_line(record_line)?;
            let line_no = self.line_no;
            let normalized = normalize_line(&line);
            let values: Vec<&str> = normalized.split_whitespace().collect();
            if values.len() < wanted {
                return Err(format!(
                    "line {}: history line has {} observations, expected at least {}",
                    line_no,
                    values.len(),
                    wanted
                )
                .into());
            }
            let mut row = Vec::with_capacity(wanted);
            for token in &values[..wanted] {
                row.push(parse_number(token, "history observation", line_no)?);
            }
            history.push(row);
        }

        Ok(Block::Kept(TweetRecord {
            retweets,
            followers,
            flags,
            sentiment,
            topic,
            periods,
            history,
        }))
    }
}

impl<R: BufRead> Iterator for SampleReader<R> {
    type Item = Result<Block, Box<dyn Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_block()
    }
}

/// Reads a whole sample, keeping tweets whose observed history meets the
/// period threshold.
///
/// When a topic index is supplied (the training pass), every kept tweet is
/// counted into it under its label bucket. The test pass must pass `None`.
pub fn read_sample<R: BufRead>(
    input: R,
    minimum_periods: u32,
    mut topics: Option<&mut TopicIndex>,
) -> Result<(Vec<TweetRecord>, Vec<f64>), Box<dyn Error>> {
    let mut records = Vec::new();
    let mut labels = Vec::new();
    for block in SampleReader::new(input, minimum_periods) {
        match block? {
            Block::Kept(record) => {
                let label = record.retweets;
                if let Some(index) = topics.as_deref_mut() {
                    index.record(bucket_of(label), &record.topic);
                }
                labels.push(label);
                records.push(record);
            }
            Block::BelowThreshold => {}
        }
    }
    Ok((records, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn history_lines(periods: usize) -> String {
        let mut out = String::new();
        for series in 0..HISTORY_LINES {
            let values: Vec<String> = (0..periods)
                .map(|p| format!("{}.0", series * 10 + p))
                .collect();
            out.push_str(&values.join(" "));
            out.push('\n');
        }
        out
    }

    fn record(header: &str, periods: usize) -> String {
        format!("{}\n{}", header, history_lines(periods))
    }

    #[test]
    fn test_parses_header_fields() {
        let sample = record(
            "5 0 1 120 true false 0 1 0 0 0 1 neu Sports 10.0 5.0 2.0 4",
            4,
        );
        let (records, labels) = read_sample(Cursor::new(sample), 3, None).unwrap();
        assert_eq!(labels, vec![5.0]);
        let tweet = &records[0];
        assert_eq!(tweet.followers, 120.0);
        assert_eq!(tweet.flags, [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(tweet.sentiment, 1);
        assert_eq!(tweet.topic, "Sports");
        assert_eq!(tweet.periods, 4);
        // minimumPeriods = 3 keeps the first two observations of each of
        // the eight series.
        assert_eq!(tweet.history.len(), HISTORY_LINES);
        assert_eq!(tweet.history[0], vec![0.0, 1.0]);
        assert_eq!(tweet.history[7], vec![70.0, 71.0]);
    }

    #[test]
    fn test_multi_word_topics_collapse() {
        let sample = record(
            "0 0 0 10 0 0 0 0 0 0 0 0 pos Human Interest 1.0 1.0 1.0 4",
            4,
        );
        let (records, _) = read_sample(Cursor::new(sample), 2, None).unwrap();
        assert_eq!(records[0].topic, "Human_Interest");
        assert_eq!(records[0].sentiment, 2);
    }

    #[test]
    fn test_below_threshold_record_is_skipped_but_consumed() {
        let mut sample = record("3 0 0 50 0 0 0 0 0 0 0 0 neg Sports 1.0 1.0 1.0 2", 2);
        sample.push_str(&record(
            "80 0 0 900 1 1 1 1 1 1 1 1 pos Politics 1.0 1.0 1.0 6",
            6,
        ));
        let (records, labels) = read_sample(Cursor::new(sample), 4, None).unwrap();
        // The first record has only 2 observed periods; it must be skipped
        // without desynchronizing the second record's block.
        assert_eq!(labels, vec![80.0]);
        assert_eq!(records[0].topic, "Politics");
    }

    #[test]
    fn test_truncated_record_fails() {
        let mut sample = String::from("5 0 1 120 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 4\n");
        // Only five of the eight continuation lines are present.
        for _ in 0..5 {
            sample.push_str("1.0 2.0 3.0\n");
        }
        let result = read_sample(Cursor::new(sample), 2, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_skipped_record_fails() {
        let sample = String::from("5 0 1 120 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 1\n");
        let result = read_sample(Cursor::new(sample), 4, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_history_line_fails() {
        let mut sample = String::from("5 0 1 120 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 4\n");
        for _ in 0..HISTORY_LINES {
            sample.push_str("1.0\n");
        }
        // Three observations per line are required for minimumPeriods = 4.
        let result = read_sample(Cursor::new(sample), 4, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_numeric_field_fails() {
        let sample = record("5 0 1 lots 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 4", 4);
        let result = read_sample(Cursor::new(sample), 2, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_training_pass_feeds_topic_index() {
        let mut sample = record("0 0 0 10 0 0 0 0 0 0 0 0 neu Politics 1.0 1.0 1.0 4", 4);
        sample.push_str(&record("5 0 0 10 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 4", 4));
        sample.push_str(&record("7 0 0 10 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 4", 4));
        let mut topics = TopicIndex::new();
        read_sample(Cursor::new(sample), 2, Some(&mut topics)).unwrap();
        // Buckets 0, 1, 1: both bucket-1 tweets are Sports, the bucket-0
        // tweet is not.
        assert_eq!(topics.ratio(1, "Sports"), 1.0);
        assert_eq!(topics.ratio(0, "Sports"), 0.0);
        assert_eq!(topics.ratio(2, "Sports"), 0.0);
    }

    #[test]
    fn test_test_split_ratios_come_from_training_counts() {
        let mut training = record("0 0 0 10 0 0 0 0 0 0 0 0 neu Politics 1.0 1.0 1.0 4", 4);
        training.push_str(&record("5 0 0 10 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 4", 4));
        training.push_str(&record("7 0 0 10 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 4", 4));
        let mut topics = TopicIndex::new();
        read_sample(Cursor::new(training), 2, Some(&mut topics)).unwrap();

        let test = record("3 0 0 10 0 0 0 0 0 0 0 0 neu Sports 1.0 1.0 1.0 4", 4);
        let (test_records, _) = read_sample(Cursor::new(test), 2, None).unwrap();
        let vector = crate::features::assemble(&test_records[0], &topics).unwrap();

        // The test tweet sits in bucket 1, so its own-bucket ratio (both
        // bucket-1 training tweets are Sports) leads the block, followed by
        // buckets 0, 2 and 3 where Sports never occurs.
        let ratios = &vector[vector.len() - 4..];
        assert_eq!(ratios.to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
    }
}
