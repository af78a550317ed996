//! Coarse geographic classification of proxy node names.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionTag {
    HongKong,
    Taiwan,
    Japan,
    Singapore,
    Korea,
    UnitedStates,
    Other,
}

impl RegionTag {
    pub fn label(self) -> &'static str {
        match self {
            RegionTag::HongKong => "Hong Kong",
            RegionTag::Taiwan => "Taiwan",
            RegionTag::Japan => "Japan",
            RegionTag::Singapore => "Singapore",
            RegionTag::Korea => "Korea",
            RegionTag::UnitedStates => "United States",
            RegionTag::Other => "Other",
        }
    }
}

impl fmt::Display for RegionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Order matters: the first rule with a matching keyword wins.
// Keywords are lowercase; names are lowercased before matching. Short ASCII
// codes (`hk`, `us`, `usa`) only match as standalone tokens.
const RULES: &[(RegionTag, &[&str])] = &[
    (
        RegionTag::HongKong,
        &["香港", "hong kong", "hongkong", "hk", "🇭🇰"],
    ),
    (
        RegionTag::Taiwan,
        &["台湾", "台灣", "taiwan", "taipei", "tw", "🇹🇼"],
    ),
    (
        RegionTag::Japan,
        &["日本", "东京", "大阪", "japan", "tokyo", "osaka", "jp", "🇯🇵"],
    ),
    (
        RegionTag::Singapore,
        &["新加坡", "狮城", "singapore", "sg", "🇸🇬"],
    ),
    (
        RegionTag::Korea,
        &["韩国", "韓國", "首尔", "korea", "seoul", "kr", "🇰🇷"],
    ),
    (
        RegionTag::UnitedStates,
        &[
            "美国",
            "美國",
            "united states",
            "los angeles",
            "san jose",
            "seattle",
            "usa",
            "us",
            "🇺🇸",
        ],
    ),
];

pub fn classify(name: &str) -> RegionTag {
    let lower = name.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| matches_keyword(&lower, k)))
        .map(|(tag, _)| *tag)
        .unwrap_or(RegionTag::Other)
}

fn is_short_code(keyword: &str) -> bool {
    keyword.len() <= 3 && keyword.bytes().all(|b| b.is_ascii_lowercase())
}

fn matches_keyword(name: &str, keyword: &str) -> bool {
    if !is_short_code(keyword) {
        return name.contains(keyword);
    }
    // Digits and CJK may touch a code (`hk01`, `东京jp`); latin letters may not (`russia`).
    name.match_indices(keyword).any(|(i, k)| {
        let before = name[..i].chars().next_back();
        let after = name[i + k.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphabetic())
            && !after.is_some_and(|c| c.is_ascii_alphabetic())
    })
}

/// Region counts in first-encountered order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionHistogram {
    counts: Vec<(RegionTag, usize)>,
}

impl RegionHistogram {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hist = Self::default();
        for name in names {
            hist.add(classify(name.as_ref()));
        }
        hist
    }

    pub fn add(&mut self, tag: RegionTag) {
        match self.counts.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((tag, 1)),
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl fmt::Display for RegionHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (tag, n)) in self.counts.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{tag}:{n}")?;
        }
        Ok(())
    }
}
