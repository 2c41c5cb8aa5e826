use aprender::mining::Apriori;
use itertools::Itertools;

use crate::buckets::NUM_RT_BUCKETS;
use crate::features::SCALAR_NAMES;
use crate::itemizer::Itemizer;
use crate::sample_reader::TweetRecord;

/// Minimum number of transactions an itemset must occur in to be reported.
pub const DEFAULT_MIN_SUPPORT: u32 = 20;

fn follower_range_tag(followers: f64) -> String {
    let range = if followers < 50.0 {
        "0-49"
    } else if followers < 100.0 {
        "50-99"
    } else if followers < 500.0 {
        "100-499"
    } else if followers < 1000.0 {
        "500-999"
    } else if followers < 5000.0 {
        "1000-4999"
    } else if followers < 10000.0 {
        "5000-9999"
    } else {
        "10000+"
    };
    format!("#followers: {}", range)
}

fn sentiment_tag(sentiment: i64) -> &'static str {
    // The tag path keeps the original's lenient mapping: anything that is
    // not negative or neutral counts as positive.
    match sentiment {
        0 => "Sentiment: Negative",
        1 => "Sentiment: Neutral",
        _ => "Sentiment: Positive",
    }
}

/// Converts one tweet into its categorical tag set: the follower range,
/// one tag per flag that is set, the sentiment and the topic.
pub fn tweet_tags(record: &TweetRecord) -> Vec<String> {
    let mut tags = vec![follower_range_tag(record.followers)];
    for (&flag, &name) in record.flags.iter().zip(SCALAR_NAMES[1..].iter()) {
        if flag != 0.0 {
            tags.push(name.to_owned());
        }
    }
    tags.push(sentiment_tag(record.sentiment).to_owned());
    tags.push(format!("Topic: {}", record.topic));
    tags
}

/// Frequent itemsets of one transaction partition with their absolute
/// support counts, ordered by descending support.
pub struct MinedGroup {
    pub label: String,
    pub transaction_count: usize,
    pub itemsets: Vec<(Vec<String>, usize)>,
}

/// Mines the frequent itemsets of one partition, keeping those occurring
/// in at least `min_support` transactions.
pub fn mine_frequent(transactions: &[Vec<String>], min_support: u32) -> Vec<(Vec<String>, usize)> {
    if transactions.is_empty() || min_support == 0 {
        return Vec::new();
    }

    let mut itemizer = Itemizer::new();
    let id_transactions: Vec<Vec<usize>> = transactions
        .iter()
        .map(|tags| itemizer.to_id_vec(tags))
        .collect();

    let count = id_transactions.len() as f64;
    let mut apriori = Apriori::new().with_min_support(f64::from(min_support) / count);
    apriori.fit(&id_transactions);

    apriori
        .get_frequent_itemsets()
        .into_iter()
        .map(|(items, support)| {
            let tags: Vec<String> = items
                .iter()
                .map(|&id| itemizer.str_of(id).to_owned())
                .sorted()
                .collect();
            ((support * count).round() as usize, tags)
        })
        .sorted_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(support, tags)| (tags, support))
        .collect()
}

/// Mines the combined sample and each retweet-bucket partition.
pub fn mine_bucket_partitions(
    transactions: &[Vec<String>],
    buckets: &[usize],
    min_support: u32,
) -> Vec<MinedGroup> {
    let labels = ["All buckets", "RT = 0", "RT <= 10", "RT <= 50", "RT > 50"];

    let mut partitions: Vec<Vec<Vec<String>>> = vec![Vec::new(); NUM_RT_BUCKETS];
    for (tags, &bucket) in transactions.iter().zip(buckets.iter()) {
        partitions[bucket].push(tags.clone());
    }

    let mut groups = Vec::with_capacity(NUM_RT_BUCKETS + 1);
    groups.push(MinedGroup {
        label: labels[0].to_owned(),
        transaction_count: transactions.len(),
        itemsets: mine_frequent(transactions, min_support),
    });
    for (bucket, partition) in partitions.into_iter().enumerate() {
        groups.push(MinedGroup {
            label: labels[bucket + 1].to_owned(),
            transaction_count: partition.len(),
            itemsets: mine_frequent(&partition, min_support),
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_reader::HISTORY_LINES;

    fn record(followers: f64, flags: [f64; 8], sentiment: i64, topic: &str) -> TweetRecord {
        TweetRecord {
            retweets: 0.0,
            followers,
            flags,
            sentiment,
            topic: topic.to_owned(),
            periods: 1,
            history: vec![Vec::new(); HISTORY_LINES],
        }
    }

    #[test]
    fn test_quiet_tweet_tags() {
        let tweet = record(75.0, [0.0; 8], 1, "X");
        let tags = tweet_tags(&tweet);
        assert_eq!(
            tags,
            vec!["#followers: 50-99", "Sentiment: Neutral", "Topic: X"]
        );
    }

    #[test]
    fn test_flag_tags() {
        let tweet = record(
            20_000.0,
            [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            0,
            "Politics",
        );
        let tags = tweet_tags(&tweet);
        assert_eq!(
            tags,
            vec![
                "#followers: 10000+",
                "isDirect",
                "hasHashtag",
                "hasURL",
                "Sentiment: Negative",
                "Topic: Politics"
            ]
        );
    }

    #[test]
    fn test_follower_bin_edges() {
        let bins = [
            (0.0, "0-49"),
            (49.0, "0-49"),
            (50.0, "50-99"),
            (99.0, "50-99"),
            (100.0, "100-499"),
            (999.0, "500-999"),
            (1000.0, "1000-4999"),
            (9999.0, "5000-9999"),
            (10000.0, "10000+"),
        ];
        for (followers, range) in bins {
            assert_eq!(
                follower_range_tag(followers),
                format!("#followers: {}", range)
            );
        }
    }

    #[test]
    fn test_mine_frequent_counts_support() {
        let transactions: Vec<Vec<String>> = vec![
            vec!["a".to_owned(), "b".to_owned()],
            vec!["a".to_owned(), "b".to_owned()],
            vec!["a".to_owned(), "b".to_owned()],
            vec!["a".to_owned(), "c".to_owned()],
        ];
        let itemsets = mine_frequent(&transactions, 3);
        assert!(itemsets.contains(&(vec!["a".to_owned()], 4)));
        assert!(itemsets.contains(&(vec!["b".to_owned()], 3)));
        assert!(itemsets.contains(&(vec!["a".to_owned(), "b".to_owned()], 3)));
        // "c" occurs once, below the support threshold.
        assert!(itemsets.iter().all(|(tags, _)| !tags.contains(&"c".to_owned())));
    }

    #[test]
    fn test_partitions_by_bucket() {
        let transactions: Vec<Vec<String>> = vec![
            vec!["a".to_owned()],
            vec!["a".to_owned()],
            vec!["b".to_owned()],
        ];
        let buckets = vec![0, 0, 3];
        let groups = mine_bucket_partitions(&transactions, &buckets, 1);
        assert_eq!(groups.len(), 5);
        assert_eq!(groups[0].label, "All buckets");
        assert_eq!(groups[0].transaction_count, 3);
        assert_eq!(groups[1].transaction_count, 2);
        assert_eq!(groups[2].transaction_count, 0);
        assert_eq!(groups[4].transaction_count, 1);
        assert!(groups[1]
            .itemsets
            .contains(&(vec!["a".to_owned()], 2)));
    }

    #[test]
    fn test_empty_partition_mines_nothing() {
        assert!(mine_frequent(&[], 20).is_empty());
    }
}
