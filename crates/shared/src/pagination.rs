//! # オフセットページネーション
//!
//! 一覧系クエリのページ指定とページ付き結果の型。

use serde::{Deserialize, Serialize};

/// 一覧取得のページ指定（オフセット方式）
///
/// `offset` は 0 始まり。`limit` は 1〜[`PageRequest::MAX_LIMIT`] に
/// クランプされる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    offset: u64,
    limit:  u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// ページ指定を作成する。limit は 1〜MAX_LIMIT に収める
    pub fn new(offset: u64, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

/// ページ付きの結果
///
/// `total` は条件に一致する全件数。`items.len() < limit` かつ
/// `offset + items.len() < total` は起こらない（最後のページでのみ短くなる）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_new_limitが範囲内に収まる() {
        assert_eq!(PageRequest::new(0, 0).limit(), 1);
        assert_eq!(PageRequest::new(0, 50).limit(), 50);
        assert_eq!(PageRequest::new(0, 1000).limit(), PageRequest::MAX_LIMIT);
    }

    #[test]
    fn test_defaultのページ指定() {
        let page = PageRequest::default();

        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), PageRequest::DEFAULT_LIMIT);
    }
}
