use std::collections::BTreeMap;

/// 页码到页面内容的映射
///
/// 内部使用 `BTreeMap`，遍历顺序始终是页码升序；
/// 同一页码再次写入时覆盖旧值（后写覆盖）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMap {
    pages: BTreeMap<u32, String>,
}

impl PageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一页，返回被覆盖的旧内容
    pub fn insert(&mut self, page: u32, content: String) -> Option<String> {
        self.pages.insert(page, content)
    }

    pub fn get(&self, page: u32) -> Option<&str> {
        self.pages.get(&page).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// 按页码升序遍历
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.pages.iter().map(|(page, content)| (*page, content.as_str()))
    }

    /// 按页码升序返回所有页码
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }
}

impl FromIterator<(u32, String)> for PageMap {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PageMap {
    type Item = (u32, String);
    type IntoIter = std::collections::btree_map::IntoIter<u32, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.into_iter()
    }
}
