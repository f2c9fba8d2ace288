use std::borrow::Cow;

/// Container-qualified name of a table, optionally aliased.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityLocation {
    /// Schema (may be empty).
    pub container: Cow<'static, str>,
    /// Table name.
    pub name: Cow<'static, str>,
    /// Alias used to reference the table once declared (may be empty).
    pub alias: Cow<'static, str>,
}

impl EntityLocation {
    pub const fn table(container: &'static str, name: &'static str) -> Self {
        Self {
            container: Cow::Borrowed(container),
            name: Cow::Borrowed(name),
            alias: Cow::Borrowed(""),
        }
    }

    pub fn aliased(mut self, alias: impl Into<Cow<'static, str>>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn is_aliased(&self) -> bool {
        !self.alias.is_empty()
    }

    /// Dotted name used in diagnostics: the alias when present, else `container.name`.
    pub fn full_name(&self) -> String {
        let mut result = String::new();
        if !self.alias.is_empty() {
            result.push_str(&self.alias);
        } else {
            if !self.container.is_empty() {
                result.push_str(&self.container);
                result.push('.');
            }
            result.push_str(&self.name);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::EntityLocation;

    #[test]
    fn full_name() {
        let location = EntityLocation::table("dbo", "Account");
        assert_eq!(location.full_name(), "dbo.Account");
        assert_eq!(location.clone().aliased("a").full_name(), "a");
        assert_eq!(EntityLocation::table("", "Account").full_name(), "Account");
    }
}
