use anyhow::Result;
use serde::Serialize;
use std::future::Future;

/// A token as listed by a market-cap ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

/// Supplies a ranked list of tradable assets, largest first.
pub trait AssetUniverse {
    fn top_assets(&self, count: usize) -> impl Future<Output = Result<Vec<TokenInfo>>> + Send;
}

/// Fixed ranking, for tests and offline runs.
#[derive(Clone, Debug, Default)]
pub struct StaticUniverse(pub Vec<TokenInfo>);

impl AssetUniverse for StaticUniverse {
    async fn top_assets(&self, count: usize) -> Result<Vec<TokenInfo>> {
        Ok(self.0.iter().take(count).cloned().collect())
    }
}

/// Takes the last `size` tokens of a ranking, i.e. the smallest caps among the
/// fetched top tokens. Returns the whole ranking if it is shorter than `size`.
pub fn select_portfolio(ranked: &[TokenInfo], size: usize) -> Vec<TokenInfo> {
    let start = ranked.len().saturating_sub(size);
    ranked[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(n: usize) -> Vec<TokenInfo> {
        (1..=n)
            .map(|i| TokenInfo {
                id: format!("token-{}", i),
                symbol: format!("t{}", i),
                name: format!("Token {}", i),
            })
            .collect()
    }

    #[test]
    fn test_select_tail_of_ranking() {
        let picked = select_portfolio(&ranking(25), 10);
        assert_eq!(picked.len(), 10);
        assert_eq!(picked[0].id, "token-16");
        assert_eq!(picked[9].id, "token-25");
    }

    #[test]
    fn test_select_short_ranking() {
        let picked = select_portfolio(&ranking(3), 10);
        assert_eq!(picked, ranking(3));
        assert!(select_portfolio(&[], 10).is_empty());
    }

    #[tokio::test]
    async fn test_static_universe_truncates() {
        let universe = StaticUniverse(ranking(30));
        let top = universe.top_assets(25).await.unwrap();
        assert_eq!(top.len(), 25);
        assert_eq!(top[0].id, "token-1");
    }
}
