use std::error::Error;

use aprender::primitives::Matrix;

use crate::buckets::{bucket_of, NUM_RT_BUCKETS};
use crate::sample_reader::{TweetRecord, HISTORY_LINES};
use crate::topic_index::TopicIndex;

/// The nine scalar columns at the front of every feature vector, in order.
pub const SCALAR_NAMES: [&str; 9] = [
    "#followers",
    "isDirect",
    "isMention",
    "hasExclamation",
    "hasHashtag",
    "hasEmoticonNegative",
    "hasEmoticonPositive",
    "hasQuestion",
    "hasURL",
];

const SENTIMENT_NAMES: [&str; 3] = [
    "SentimentNegative",
    "SentimentNeutral",
    "SentimentPositive",
];

// One name per continuation line of a record block, in file order.
const SERIES_NAMES: [&str; HISTORY_LINES] = [
    "Retweets",
    "RetweetsDif",
    "Probability",
    "ProbabilityDif",
    "Views",
    "ViewsDif",
    "FollowerAvg",
    "FollowerAvgDif",
];

/// Encodes the sentiment category over the fixed categories {0, 1, 2}.
/// Anything else is an encoding error, never a silent default.
pub fn one_hot_sentiment(sentiment: i64) -> Result<[f32; 3], Box<dyn Error>> {
    match sentiment {
        0 => Ok([1.0, 0.0, 0.0]),
        1 => Ok([0.0, 1.0, 0.0]),
        2 => Ok([0.0, 0.0, 1.0]),
        other => Err(format!("unknown sentiment category: {}", other).into()),
    }
}

/// Builds the feature vector for one tweet: 9 scalars, the sentiment
/// one-hot, the unrolled history block, then the 4 topic-affinity ratios
/// with the tweet's own label bucket first and the remaining buckets in
/// ascending order.
pub fn assemble(record: &TweetRecord, topics: &TopicIndex) -> Result<Vec<f32>, Box<dyn Error>> {
    let mut vector = Vec::new();
    vector.push(record.followers as f32);
    for &flag in &record.flags {
        vector.push(flag as f32);
    }
    vector.extend(one_hot_sentiment(record.sentiment)?);
    for row in &record.history {
        for &value in row {
            vector.push(value as f32);
        }
    }

    let own = bucket_of(record.retweets);
    vector.push(topics.ratio(own, &record.topic) as f32);
    for bucket in 0..NUM_RT_BUCKETS {
        if bucket != own {
            vector.push(topics.ratio(bucket, &record.topic) as f32);
        }
    }

    Ok(vector)
}

/// Assembles a whole sample into the row-major matrix the classifiers
/// consume. All rows of a sample share one schema, so the width comes from
/// the first row.
pub fn feature_matrix(
    records: &[TweetRecord],
    topics: &TopicIndex,
) -> Result<Matrix<f32>, Box<dyn Error>> {
    if records.is_empty() {
        return Err("sample contains no tweets meeting the period threshold".into());
    }
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        rows.push(assemble(record, topics)?);
    }
    let columns = rows[0].len();
    let mut flat = Vec::with_capacity(rows.len() * columns);
    for row in &rows {
        flat.extend_from_slice(row);
    }
    Matrix::from_vec(rows.len(), columns, flat).map_err(Into::into)
}

/// Column names for the schema at the given resolution, used to label the
/// forest's feature importances.
pub fn feature_names(minimum_periods: u32) -> Vec<String> {
    let periods = minimum_periods.saturating_sub(1) as usize;
    let mut names: Vec<String> = SCALAR_NAMES.iter().map(|&n| n.to_owned()).collect();
    names.extend(SENTIMENT_NAMES.iter().map(|&n| n.to_owned()));
    for series in SERIES_NAMES {
        for period in 1..=periods {
            names.push(format!("{} {}", series, period));
        }
    }
    for bucket in 1..=NUM_RT_BUCKETS {
        names.push(format!("TopicBucket {}", bucket));
    }
    names
}
