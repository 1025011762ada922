// src/recipe/format/sdl.rs

//! S-expression-like recipe back-end (the `dub.sdl` style of grammar):
//! whitespace-separated statements, optionally carrying `key="value"`
//! attributes and a `{ ... }` nested block.
//!
//! ```text
//! name "vibe.d"
//! version "1.2.3"
//! targetType "library"
//! dependency "vibe-core" version="~>1.0" optional="true"
//!
//! configuration "unittest" {
//!     targetType "executable"
//!     sourceFiles "tests/*.d"
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::version::Constraint;

use super::super::model::{
    Configuration, Dependency, PackageName, Recipe, SubpackageRef, TargetType,
};
use super::super::platform::PlatformPredicate;
use super::super::settings::BuildSettings;
use super::RecipeFormat;

#[derive(Debug, Clone)]
enum Tok {
    Ident(String),
    Str(String),
    Eq,
    LBrace,
    RBrace,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
    line: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.char_indices().peekable(),
            src,
            line: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Tok, u32)>> {
        let mut out = Vec::new();
        while let Some(&(i, c)) = self.chars.peek() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '/' => {
                    self.chars.next();
                    match self.chars.peek() {
                        Some(&(_, '/')) => {
                            while let Some(&(_, c)) = self.chars.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.chars.next();
                            }
                        }
                        Some(&(_, '*')) => {
                            self.chars.next();
                            loop {
                                match self.chars.next() {
                                    None => break,
                                    Some((_, '\n')) => self.line += 1,
                                    Some((_, '*')) if matches!(self.chars.peek(), Some(&(_, '/'))) => {
                                        self.chars.next();
                                        break;
                                    }
                                    _ => {}
                                }
                            }
                        }
                        _ => {}
                    }
                }
                '{' => {
                    self.chars.next();
                    out.push((Tok::LBrace, self.line));
                }
                '}' => {
                    self.chars.next();
                    out.push((Tok::RBrace, self.line));
                }
                '=' => {
                    self.chars.next();
                    out.push((Tok::Eq, self.line));
                }
                '"' => {
                    let start_line = self.line;
                    self.chars.next();
                    let mut s = String::new();
                    loop {
                        match self.chars.next() {
                            None => {
                                return Err(Error::RecipeParse {
                                    file: PathBuf::new(),
                                    line: start_line,
                                    message: "unterminated string literal".into(),
                                })
                            }
                            Some((_, '"')) => break,
                            Some((_, '\\')) => {
                                if let Some((_, next)) = self.chars.next() {
                                    s.push(match next {
                                        'n' => '\n',
                                        't' => '\t',
                                        other => other,
                                    });
                                }
                            }
                            Some((_, c)) => s.push(c),
                        }
                    }
                    out.push((Tok::Str(s), start_line));
                }
                _ if c.is_alphanumeric() || c == '_' || c == '-' || c == ':' || c == '.' => {
                    let start = i;
                    let start_line = self.line;
                    while let Some(&(j, c)) = self.chars.peek() {
                        if c.is_alphanumeric() || c == '_' || c == '-' || c == ':' || c == '.' {
                            self.chars.next();
                        } else {
                            let _ = j;
                            break;
                        }
                    }
                    let end = self.chars.peek().map(|&(j, _)| j).unwrap_or(self.src.len());
                    out.push((Tok::Ident(self.src[start..end].to_string()), start_line));
                }
                other => {
                    return Err(Error::RecipeParse {
                        file: PathBuf::new(),
                        line: self.line,
                        message: format!("unexpected character '{other}'"),
                    })
                }
            }
        }
        Ok(out)
    }
}

/// A single positional or `key="value"` argument to a statement.
enum Arg {
    Positional(String),
    Keyword(String, String),
}

struct Statement {
    name: String,
    args: Vec<Arg>,
    block: Option<Vec<Statement>>,
    line: u32,
}

struct Parser {
    toks: Vec<(Tok, u32)>,
    pos: usize,
}

impl Parser {
    fn parse_block(&mut self) -> Result<Vec<Statement>> {
        let mut stmts = Vec::new();
        while self.pos < self.toks.len() {
            if matches!(self.toks[self.pos].0, Tok::RBrace) {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let (name, line) = match &self.toks[self.pos].0 {
            Tok::Ident(s) => (s.clone(), self.toks[self.pos].1),
            _ => {
                return Err(Error::RecipeParse {
                    file: PathBuf::new(),
                    line: self.toks[self.pos].1,
                    message: "expected a statement name".into(),
                })
            }
        };
        self.pos += 1;
        let mut args = Vec::new();
        loop {
            match self.toks.get(self.pos).map(|(t, _)| t) {
                Some(Tok::Str(s)) => {
                    let s = s.clone();
                    // Lookahead for `key=` already consumed as Ident before Eq;
                    // positional strings are pushed directly.
                    args.push(Arg::Positional(s));
                    self.pos += 1;
                }
                Some(Tok::Ident(key)) if matches!(self.toks.get(self.pos + 1).map(|(t, _)| t), Some(Tok::Eq)) => {
                    let key = key.clone();
                    self.pos += 2; // ident, '='
                    let value = match self.toks.get(self.pos).map(|(t, _)| t) {
                        Some(Tok::Str(v)) => v.clone(),
                        Some(Tok::Ident(v)) => v.clone(),
                        _ => {
                            return Err(Error::RecipeParse {
                                file: PathBuf::new(),
                                line,
                                message: format!("expected value for attribute '{key}'"),
                            })
                        }
                    };
                    self.pos += 1;
                    args.push(Arg::Keyword(key, value));
                }
                _ => break,
            }
        }
        let block = if matches!(self.toks.get(self.pos).map(|(t, _)| t), Some(Tok::LBrace)) {
            self.pos += 1;
            let inner = self.parse_block()?;
            if !matches!(self.toks.get(self.pos).map(|(t, _)| t), Some(Tok::RBrace)) {
                return Err(Error::RecipeParse {
                    file: PathBuf::new(),
                    line,
                    message: "unterminated block".into(),
                });
            }
            self.pos += 1;
            Some(inner)
        } else {
            None
        };
        Ok(Statement { name, args, block, line })
    }
}

fn positional_strings(stmt: &Statement) -> Vec<&str> {
    stmt.args
        .iter()
        .filter_map(|a| match a {
            Arg::Positional(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

fn keyword(stmt: &Statement, key: &str) -> Option<&str> {
    stmt.args.iter().find_map(|a| match a {
        Arg::Keyword(k, v) if k == key => Some(v.as_str()),
        _ => None,
    })
}

fn target_type_from_str(s: &str) -> TargetType {
    match s {
        "executable" => TargetType::Executable,
        "staticLibrary" => TargetType::StaticLibrary,
        "dynamicLibrary" => TargetType::DynamicLibrary,
        "sourceLibrary" => TargetType::SourceLibrary,
        "object" => TargetType::Object,
        "none" => TargetType::None,
        _ => TargetType::Library,
    }
}

/// Apply a flat (no-`configuration`/`subpackage`/`buildType` nesting) list
/// of statements onto a settings bundle keyed by an optional platform
/// suffix, plus mutate `recipe` for name/version/dependency statements.
fn apply_statement(
    stmt: &Statement,
    recipe: &mut Recipe,
    settings_out: &mut Vec<(PlatformPredicate, BuildSettings)>,
    target_type_out: &mut Option<TargetType>,
    file: &Path,
) -> Result<()> {
    let (base, suffix) = match stmt.name.split_once('-') {
        Some((b, s)) => (b, s),
        None => (stmt.name.as_str(), ""),
    };
    let pred = PlatformPredicate::parse(suffix);
    let args = positional_strings(stmt);

    macro_rules! push_list {
        ($field:ident) => {{
            let mut s = BuildSettings::default();
            s.$field = args.iter().map(|s| s.to_string()).collect();
            settings_out.push((pred.clone(), s));
        }};
    }

    match base {
        "name" => {
            if let Some(n) = args.first() {
                recipe.name = PackageName::new(*n);
            }
        }
        "version" => {
            if let Some(v) = args.first() {
                recipe.version = Some(if let Some(b) = v.strip_prefix('~') {
                    crate::version::VersionId::branch(b)
                } else {
                    semver::Version::parse(v)
                        .map(crate::version::VersionId::Release)
                        .map_err(|e| Error::RecipeParse {
                            file: file.to_path_buf(),
                            line: stmt.line,
                            message: e.to_string(),
                        })?
                });
            }
        }
        "targetType" => {
            if let Some(t) = args.first() {
                *target_type_out = Some(target_type_from_str(t));
            }
        }
        "dependency" => {
            let name = args.first().copied().unwrap_or_default();
            let version = keyword(stmt, "version").unwrap_or("*");
            let constraint = Constraint::parse(version).map_err(|e| Error::RecipeParse {
                file: file.to_path_buf(),
                line: stmt.line,
                message: format!("invalid constraint for '{name}': {e}"),
            })?;
            let mut d = Dependency::new(PackageName::new(name), constraint);
            d.optional = keyword(stmt, "optional") == Some("true");
            d.default = keyword(stmt, "default") == Some("true");
            d.sub_configuration = keyword(stmt, "subConfiguration").map(|s| s.to_string());
            if let Some(path) = keyword(stmt, "path") {
                d.path = Some(PathBuf::from(path));
                d.constraint = Constraint::path(path);
            }
            recipe.dependencies.push(d);
        }
        "versions" => push_list!(versions),
        "importPaths" => push_list!(import_paths),
        "stringImportPaths" => push_list!(string_import_paths),
        "sourceFiles" => push_list!(source_files),
        "excludedSourceFiles" => push_list!(excluded_source_files),
        "dflags" => push_list!(dflags),
        "lflags" => push_list!(lflags),
        "cflags" => push_list!(cflags),
        "libs" => push_list!(libs),
        "copyFiles" => push_list!(copy_files),
        "subpackage" => {
            let path = args.first().copied().unwrap_or_default();
            if let Some(block) = &stmt.block {
                let mut sub = Recipe::new(PackageName::new(""));
                apply_statements(block, &mut sub, file)?;
                recipe.subpackages.push(SubpackageRef::Inline(Box::new(sub)));
            } else {
                recipe.subpackages.push(SubpackageRef::Path(PathBuf::from(path)));
            }
        }
        _ => {
            // Unrecognized statements (toolchainRequirements, license,
            // description, authors, ...) are accepted and ignored; the
            // neutral model only carries what the resolver/builder need.
        }
    }
    Ok(())
}

fn apply_statements(stmts: &[Statement], recipe: &mut Recipe, file: &Path) -> Result<()> {
    let mut root_settings = Vec::new();
    let mut root_target = None;

    for stmt in stmts {
        match stmt.name.as_str() {
            "configuration" => {
                let name = positional_strings(stmt).first().copied().unwrap_or_default().to_string();
                let mut settings = Vec::new();
                let mut target = None;
                if let Some(block) = &stmt.block {
                    for inner in block {
                        apply_statement(inner, recipe, &mut settings, &mut target, file)?;
                    }
                }
                recipe.configurations.push(Configuration {
                    name,
                    target_type: target.unwrap_or(TargetType::Library),
                    platforms: Vec::new(),
                    settings,
                });
            }
            "buildType" => {
                let name = positional_strings(stmt).first().copied().unwrap_or_default().to_string();
                let mut settings = Vec::new();
                let mut target = None;
                if let Some(block) = &stmt.block {
                    for inner in block {
                        apply_statement(inner, recipe, &mut settings, &mut target, file)?;
                    }
                }
                let mut merged = BuildSettings::default();
                for (_, s) in settings {
                    merged.merge(&s, false);
                }
                recipe.build_types.insert(name, merged);
            }
            _ => apply_statement(stmt, recipe, &mut root_settings, &mut root_target, file)?,
        }
    }

    recipe.configurations.insert(
        0,
        Configuration {
            name: "library".to_string(),
            target_type: root_target.unwrap_or(TargetType::Executable),
            platforms: Vec::new(),
            settings: root_settings,
        },
    );
    Ok(())
}

pub struct SdlRecipeFormat;

impl RecipeFormat for SdlRecipeFormat {
    fn parse(&self, source: &str, file: &Path) -> Result<Recipe> {
        let toks = Lexer::new(source).tokenize().map_err(|e| retag(e, file))?;
        let mut parser = Parser { toks, pos: 0 };
        let stmts = parser.parse_block().map_err(|e| retag(e, file))?;
        let mut recipe = Recipe::new(PackageName::new(""));
        apply_statements(&stmts, &mut recipe, file)?;
        Ok(recipe)
    }
}

fn retag(e: Error, file: &Path) -> Error {
    match e {
        Error::RecipeParse { line, message, .. } => Error::RecipeParse {
            file: file.to_path_buf(),
            line,
            message,
        },
        other => other,
    }
}

pub fn parse_recipe_sdl(source: &str, file: &Path) -> Result<Recipe> {
    SdlRecipeFormat.parse(source, file)
}
