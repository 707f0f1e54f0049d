//! Lexicon sentiment over short news texts (headlines and descriptions).

use std::sync::OnceLock;

use regex::Regex;

use trendwire_common::{SentimentDistribution, SentimentSignal};

const POSITIVE: &[&str] = &[
    "win", "wins", "won", "success", "record", "celebrate", "celebrates", "launch", "launches",
    "breakthrough", "growth", "boost", "love", "best", "hope", "new", "opens", "improve",
    "improves", "award", "praised", "rescue", "saves", "surge", "thrive",
];

const NEGATIVE: &[&str] = &[
    "crash", "dead", "death", "dies", "killed", "loss", "fail", "fails", "failure", "crisis",
    "scandal", "lawsuit", "arrest", "arrested", "fraud", "war", "attack", "outrage", "fear",
    "decline", "layoffs", "ban", "banned", "collapse", "threat", "warning",
];

/// Emotion label and the words that signal it.
const EMOTIONS: &[(&str, &[&str])] = &[
    ("excitement", &["exciting", "thrilling", "record", "launch", "launches", "unveils", "debut"]),
    ("curiosity", &["why", "how", "mystery", "secret", "revealed", "inside", "explained"]),
    ("surprise", &["unexpected", "surprise", "surprising", "shock", "stunning", "suddenly"]),
    ("optimism", &["hope", "recovery", "improve", "improves", "promising"]),
    ("anger", &["outrage", "furious", "backlash", "slams"]),
];

/// Risk factor names line up with the brand-safety deduction table.
const RISKS: &[(&str, &[&str])] = &[
    ("political sensitivity", &["election", "senate", "congress", "president", "partisan", "campaign"]),
    ("potential controversy", &["controversy", "backlash", "boycott", "outrage", "row"]),
    ("adult content", &["explicit", "porn", "nsfw", "nude"]),
    ("violence", &["shooting", "attack", "killed", "stabbing", "war"]),
    ("illegal activity", &["arrest", "arrested", "charged", "fraud", "smuggling"]),
    ("hate speech", &["racist", "slur", "hate", "bigot"]),
    ("misinformation", &["hoax", "misleading", "conspiracy", "debunked"]),
];

/// Label threshold on the net score.
const LABEL_THRESHOLD: f64 = 0.2;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9']+").expect("valid regex"))
}

fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    word_re()
        .find_iter(&lower)
        .map(|m| m.as_str().trim_matches('\'').to_string())
        .collect()
}

/// Estimate sentiment across `texts`, one vote per text.
///
/// Returns the empty signal when there is nothing to read.
pub fn analyze<S: AsRef<str>>(texts: &[S]) -> SentimentSignal {
    let docs: Vec<Vec<String>> = texts
        .iter()
        .map(|t| words(t.as_ref()))
        .filter(|w| !w.is_empty())
        .collect();
    if docs.is_empty() {
        return SentimentSignal::default();
    }

    let (mut positive, mut negative, mut neutral) = (0usize, 0usize, 0usize);
    for doc in &docs {
        let pos = doc.iter().filter(|w| POSITIVE.contains(&w.as_str())).count();
        let neg = doc.iter().filter(|w| NEGATIVE.contains(&w.as_str())).count();
        match pos.cmp(&neg) {
            std::cmp::Ordering::Greater => positive += 1,
            std::cmp::Ordering::Less => negative += 1,
            std::cmp::Ordering::Equal => neutral += 1,
        }
    }

    let total = docs.len() as f64;
    let score = (positive as f64 - negative as f64) / total;
    let label = if score > LABEL_THRESHOLD {
        "positive"
    } else if score < -LABEL_THRESHOLD {
        "negative"
    } else {
        "neutral"
    };

    let mentions = |lexicon: &[(&str, &[&str])]| -> Vec<String> {
        lexicon
            .iter()
            .filter(|(_, cues)| docs.iter().flatten().any(|w| cues.contains(&w.as_str())))
            .map(|(name, _)| name.to_string())
            .collect()
    };

    SentimentSignal {
        overall_sentiment: Some(label.to_string()),
        sentiment_score: Some(score),
        distribution: Some(SentimentDistribution {
            positive: positive as f64 / total * 100.0,
            neutral: neutral as f64 / total * 100.0,
            negative: negative as f64 / total * 100.0,
        }),
        emotional_indicators: mentions(EMOTIONS),
        risk_factors: mentions(RISKS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_empty_signal() {
        assert_eq!(analyze::<&str>(&[]), SentimentSignal::default());
        assert_eq!(analyze(&["   "]), SentimentSignal::default());
    }

    #[test]
    fn counts_one_vote_per_text() {
        let signal = analyze(&[
            "Team wins record title",
            "Factory collapse leaves two dead",
            "Council meets on Tuesday",
            "Startup launches new app",
        ]);
        let dist = signal.distribution.unwrap();
        assert_eq!(dist.positive, 50.0);
        assert_eq!(dist.negative, 25.0);
        assert_eq!(dist.neutral, 25.0);
        assert_eq!(signal.sentiment_score, Some(0.25));
        assert_eq!(signal.overall_sentiment.as_deref(), Some("positive"));
        assert!(signal.emotional_indicators.contains(&"excitement".to_string()));
    }

    #[test]
    fn whole_words_only() {
        // "award" must not trip the "war" cue.
        let signal = analyze(&["Local baker receives award"]);
        assert!(!signal.risk_factors.contains(&"violence".to_string()));
    }

    #[test]
    fn risk_factors_use_deduction_names() {
        let signal = analyze(&["Senator arrested in fraud probe amid election backlash"]);
        assert!(signal.risk_factors.contains(&"illegal activity".to_string()));
        assert!(signal.risk_factors.contains(&"political sensitivity".to_string()));
        assert!(signal.risk_factors.contains(&"potential controversy".to_string()));
        assert_eq!(signal.overall_sentiment.as_deref(), Some("negative"));
    }
}
