//! Line commands understood by the terminal driver.

use std::str::FromStr;

use skydeck_widgets::{Theme, WidgetId};

pub const HELP: &str = "\
Commands:
  list                 show all widgets
  add [city]           add a widget, optionally looking up a city
  delete <id>          remove a widget (the last one stays)
  reset <id>           clear a widget
  reset-all            clear every widget
  fetch <id> <city>    look up a city for a widget
  refresh <id>         look up a widget's city again
  cities [query]       list matching city names
  theme [light|dark]   show or change the theme
  clear                forget saved widgets
  help                 show this help
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Add(Option<String>),
    Delete(WidgetId),
    Reset(WidgetId),
    ResetAll,
    Fetch(WidgetId, String),
    Refresh(WidgetId),
    Cities(String),
    Theme(Option<Theme>),
    Clear,
    Help,
    Quit,
}

fn parse_id(arg: Option<&str>) -> Result<WidgetId, String> {
    let arg = arg.ok_or_else(|| "missing widget id".to_string())?;
    arg.parse::<u64>()
        .map(WidgetId)
        .map_err(|_| format!("not a widget id: {}", arg))
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

        match verb.to_ascii_lowercase().as_str() {
            "" | "list" | "ls" => Ok(Self::List),
            "add" => Ok(Self::Add(rest_opt)),
            "delete" | "rm" => parse_id(rest_opt.as_deref()).map(Self::Delete),
            "reset" => parse_id(rest_opt.as_deref()).map(Self::Reset),
            "reset-all" => Ok(Self::ResetAll),
            "fetch" => {
                let (id, city) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: fetch <id> <city>".to_string())?;
                Ok(Self::Fetch(parse_id(Some(id))?, city.trim().to_string()))
            }
            "refresh" => parse_id(rest_opt.as_deref()).map(Self::Refresh),
            "cities" => Ok(Self::Cities(rest.to_string())),
            "theme" => match rest_opt {
                None => Ok(Self::Theme(None)),
                Some(name) => name.parse().map(|t| Self::Theme(Some(t))),
            },
            "clear" => Ok(Self::Clear),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command: {} (try `help`)", other)),
        }
    }
}
