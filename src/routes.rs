use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SeekSenseError};

/// Screens reachable by path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/` search dashboard
    Search,
    /// `/chat`
    Chat,
    /// `/product/:id`
    Product(u32),
}

impl Route {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        let segments: Vec<&str> = trimmed
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if !trimmed.starts_with('/') {
            return Err(SeekSenseError::validation(
                "route",
                format!("'{trimmed}' must start with '/'"),
            ));
        }

        match segments.as_slice() {
            [] => Ok(Route::Search),
            ["chat"] => Ok(Route::Chat),
            ["product", id] => id.parse::<u32>().map(Route::Product).map_err(|_| {
                SeekSenseError::validation("route", format!("'{id}' is not a product id"))
            }),
            _ => Err(SeekSenseError::validation(
                "route",
                format!("no screen at '{trimmed}'"),
            )),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Search => "/".to_string(),
            Route::Chat => "/chat".to_string(),
            Route::Product(id) => format!("/product/{id}"),
        }
    }
}

impl FromStr for Route {
    type Err = SeekSenseError;

    fn from_str(s: &str) -> Result<Self> {
        Route::parse(s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
