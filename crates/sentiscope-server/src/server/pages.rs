use minijinja::{context, Environment};
use sentiscope_core::LanguageTable;
use serde::Serialize;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

#[derive(Serialize)]
struct LanguageOption<'a> {
    code: &'a str,
    name: &'a str,
    selected: bool,
}

/// Renders the HTML pages from templates compiled into the binary
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self { env })
    }

    /// The classification page with one option per supported language
    pub fn render_index(&self, languages: &LanguageTable) -> Result<String, minijinja::Error> {
        let default_code = languages.default_code();
        let options: Vec<_> = languages
            .iter()
            .map(|language| LanguageOption {
                code: &language.code,
                name: &language.name,
                selected: language.code == default_code,
            })
            .collect();

        self.env.get_template("index.html")?.render(context! {
            languages => options,
            default_language => default_code,
        })
    }
}
