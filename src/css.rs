//! Reading and writing of `style` attribute values (`"prop: value; prop2: value2;"`).

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CssProperty {
    pub property: String,
    pub value: String,
}

impl CssProperty {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// Ordered list of style declarations. Keys are unique in practice, which
/// [`CssPropertyList::set`] maintains, but parsing does not enforce it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CssPropertyList {
    properties: Vec<CssProperty>,
}

impl CssPropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, property: &str, value: &str) -> Self {
        self.set(property, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CssProperty> {
        self.properties.iter()
    }

    /// Value of the last declaration of `property`.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|entry| entry.property == property)
            .map(|entry| entry.value.as_str())
    }

    /// Replaces the value in place when present, appends otherwise.
    pub fn set(&mut self, property: &str, value: &str) {
        let mut seen = false;
        self.properties.retain_mut(|entry| {
            if entry.property != property {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            entry.value = value.to_string();
            true
        });
        if !seen {
            self.properties.push(CssProperty::new(property, value));
        }
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let removed = self.get(property).map(str::to_string);
        self.properties.retain(|entry| entry.property != property);
        removed
    }
}

impl FromIterator<CssProperty> for CssPropertyList {
    fn from_iter<T: IntoIterator<Item = CssProperty>>(iter: T) -> Self {
        Self {
            properties: iter.into_iter().collect(),
        }
    }
}

pub fn read(style: &str) -> CssPropertyList {
    style
        .split(';')
        .filter_map(|segment| {
            let (property, value) = segment.split_once(':')?;
            let property = property.trim();
            if property.is_empty() {
                return None;
            }
            Some(CssProperty::new(property, value.trim()))
        })
        .collect()
}

pub fn write(properties: &CssPropertyList) -> String {
    let mut out = String::new();
    for entry in properties.iter().filter(|entry| !entry.property.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&entry.property);
        out.push_str(": ");
        out.push_str(&entry.value);
        out.push(';');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_size_and_color() {
        let properties = read("font-size: 16.5pt; color: rgb(0,0,255);");
        let entries: Vec<_> = properties.iter().cloned().collect();
        assert_eq!(
            entries,
            vec![
                CssProperty::new("font-size", "16.5pt"),
                CssProperty::new("color", "rgb(0,0,255)"),
            ]
        );
    }

    #[test]
    fn skips_segments_without_colon() {
        let properties = read("bogus; font-weight:bold ;;  : nothing;");
        assert_eq!(properties.len(), 1);
        assert_eq!(properties.get("font-weight"), Some("bold"));
    }

    #[test]
    fn writes_with_single_space_gaps() {
        let properties = CssPropertyList::new()
            .with("font-weight", "bold")
            .with("color", "#ff0000ff");
        assert_eq!(write(&properties), "font-weight: bold; color: #ff0000ff;");
        assert_eq!(read(&write(&properties)), properties);
    }

    #[test]
    fn set_replaces_existing_value() {
        let mut properties = read("font-size: 12pt; color: red;");
        properties.set("font-size", "14pt");
        assert_eq!(write(&properties), "font-size: 14pt; color: red;");
        assert_eq!(properties.remove("color").as_deref(), Some("red"));
        assert_eq!(write(&properties), "font-size: 14pt;");
    }
}
