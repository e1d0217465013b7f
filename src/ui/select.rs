//! Selection control state: a group of named buttons with at most one active.

use crate::prelude::HashSet;

/// A row of buttons of which at most one is active.
///
/// In toggle mode clicking the active button clears the selection; otherwise
/// it is ignored. Disabled buttons stay listed but ignore clicks.
#[derive(Debug, Clone, Default)]
pub struct SelectGroup {
    /// `(name, title)` in display order
    values: Vec<(String, String)>,
    value: Option<String>,
    toggle: bool,
    disabled: HashSet<String>,
    visible: bool,
}

impl SelectGroup {
    pub fn new<I, N, T>(values: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let mut group = Self {
            visible: true,
            ..Self::default()
        };
        group.set_values(values);
        group
    }

    /// Switches the group into toggle mode
    pub fn toggle(mut self) -> Self {
        self.toggle = true;
        self
    }

    pub fn set_values<I, N, T>(&mut self, values: I)
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        self.values = values
            .into_iter()
            .map(|(name, title)| (name.into(), title.into()))
            .collect();
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set(&mut self, value: Option<&str>) {
        self.value = value.map(str::to_string);
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.value.as_deref() == Some(name)
    }

    /// Replaces the disabled set; names not in the group are ignored
    pub fn set_disabled<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disabled = names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .filter(|name| self.values.iter().any(|(n, _)| n == name))
            .collect();
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }

    pub fn disabled(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|(name, _)| self.disabled.contains(name))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Applies a click on `name`.
    ///
    /// Returns the new value when the click changed it (`Some(None)` means
    /// cleared), or `None` when the click had no effect.
    pub fn click(&mut self, name: &str) -> Option<Option<String>> {
        if !self.values.iter().any(|(n, _)| n == name) || self.is_disabled(name) {
            return None;
        }

        if self.is_active(name) {
            if !self.toggle {
                return None;
            }
            self.value = None;
            return Some(None);
        }

        self.value = Some(name.to_string());
        Some(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlays() -> SelectGroup {
        SelectGroup::new([("hillshade", "Hillshade"), ("trails", "Trails")]).toggle()
    }

    #[test]
    fn test_click_selects() {
        let mut group = SelectGroup::new([("a", "A"), ("b", "B")]);
        assert_eq!(group.click("b"), Some(Some("b".to_string())));
        assert!(group.is_active("b"));
    }

    #[test]
    fn test_click_active_without_toggle_is_ignored() {
        let mut group = SelectGroup::new([("a", "A"), ("b", "B")]);
        group.set(Some("a"));
        assert_eq!(group.click("a"), None);
        assert_eq!(group.get(), Some("a"));
    }

    #[test]
    fn test_toggle_clears_active() {
        let mut group = overlays();
        group.click("trails");
        assert_eq!(group.click("trails"), Some(None));
        assert_eq!(group.get(), None);
    }

    #[test]
    fn test_disabled_and_unknown_ignore_clicks() {
        let mut group = overlays();
        group.set_disabled(["trails", "nope"]);

        assert_eq!(group.disabled(), vec!["trails"]);
        assert_eq!(group.click("trails"), None);
        assert_eq!(group.click("nope"), None);
        assert_eq!(group.get(), None);
    }
}
