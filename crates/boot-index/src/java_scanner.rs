//! Lexical scanner for Spring annotations in Java sources.
//!
//! No parser and no type resolution: the source is masked (comments blanked, and for
//! structural matching also literal contents blanked, byte offsets preserved) and
//! annotations are matched against the declaration that follows them. Simple names
//! are qualified through explicit imports or the file's package.

use crate::scanner::{ScanError, ScanInput, ScanOutput, Scanner};
use boot_cache::{
    AddOn, BeanInfo, Location, Position, Range, RequestMappingInfo, Symbol, SymbolKind,
    SymbolRecord,
};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Bean stereotypes and the meta-annotations they carry.
const STEREOTYPES: &[(&str, &[&str])] = &[
    ("Component", &[]),
    ("Service", &["Component"]),
    ("Repository", &["Component"]),
    ("Controller", &["Component"]),
    ("RestController", &["Controller", "Component"]),
    ("Configuration", &["Component"]),
    ("SpringBootConfiguration", &["Configuration", "Component"]),
    (
        "SpringBootApplication",
        &["SpringBootConfiguration", "Configuration", "Component"],
    ),
];

const REQUEST_MAPPINGS: &[(&str, Option<&str>)] = &[
    ("RequestMapping", None),
    ("GetMapping", Some("GET")),
    ("PostMapping", Some("POST")),
    ("PutMapping", Some("PUT")),
    ("DeleteMapping", Some("DELETE")),
    ("PatchMapping", Some("PATCH")),
];

/// Annotations indexed verbatim, without extra metadata.
const PLAIN_ANNOTATIONS: &[&str] = &[
    "Profile",
    "Value",
    "Scope",
    "Qualifier",
    "Primary",
    "Lazy",
    "Import",
    "ComponentScan",
    "EnableAutoConfiguration",
    "ConditionalOnBean",
    "ConditionalOnClass",
    "ConditionalOnMissingBean",
    "ConditionalOnProperty",
];

const METHOD_MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "synchronized",
    "default",
    "native",
    "strictfp",
];

#[derive(Clone, Copy, Debug, Default)]
pub struct JavaAnnotationScanner;

impl JavaAnnotationScanner {
    pub fn new() -> Self {
        Self
    }
}

impl Scanner for JavaAnnotationScanner {
    fn scan(&self, input: &ScanInput<'_>) -> Result<ScanOutput, ScanError> {
        let masked = Masked::new(input.content);
        let lines = LineIndex::new(input.content);
        let names = NameResolver::new(&masked.skeleton);
        let constants = string_constants(&masked.code);

        let types = type_declarations(&masked.skeleton);
        let annotations = annotations(&masked, &lines)?;
        let targets = annotation_targets(&masked.skeleton, &annotations);

        let declared_types: BTreeSet<String> = types
            .iter()
            .map(|decl| names.resolve(&decl.name))
            .collect();

        let mut dependencies = BTreeSet::new();
        for decl in &types {
            dependencies.extend(decl.supertypes.iter().map(|name| names.resolve(name)));
        }

        let mut cx = SymbolBuilder {
            input,
            names: &names,
            constants: &constants,
            symbols: Vec::new(),
            dependencies: &mut dependencies,
        };

        // Class-level request mappings prefix every method mapping of that type.
        let mut prefixes: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (annotation, target) in annotations.iter().zip(&targets) {
            if let Target::Type { decl_offset, .. } = target {
                if annotation.name == "RequestMapping" {
                    let paths = cx.paths_of(annotation).unwrap_or_default();
                    prefixes.insert(*decl_offset, paths);
                }
            }
        }

        for (annotation, target) in annotations.iter().zip(&targets) {
            match target {
                Target::Type { name, .. } => cx.type_annotation(annotation, name),
                Target::Method {
                    name, return_type, ..
                } => {
                    let class_prefixes = types
                        .iter()
                        .filter(|decl| decl.offset < annotation.start)
                        .next_back()
                        .and_then(|decl| prefixes.get(&decl.offset))
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    cx.method_annotation(annotation, name, return_type, class_prefixes)
                }
                Target::Other => cx.plain_annotation(annotation),
            }
        }

        let symbols = cx.symbols;
        for declared in &declared_types {
            dependencies.remove(declared);
        }

        Ok(ScanOutput {
            symbols,
            dependencies,
            declared_types,
        })
    }
}

struct SymbolBuilder<'a> {
    input: &'a ScanInput<'a>,
    names: &'a NameResolver,
    constants: &'a BTreeMap<String, String>,
    symbols: Vec<SymbolRecord>,
    dependencies: &'a mut BTreeSet<String>,
}

impl SymbolBuilder<'_> {
    fn push(
        &mut self,
        annotation: &Annotation,
        name: String,
        kind: SymbolKind,
        add_ons: Vec<AddOn>,
    ) {
        let location = Location {
            uri: self.input.uri.to_string(),
            range: annotation.range,
        };
        self.symbols.push(
            SymbolRecord::new(
                self.input.path,
                self.input.last_modified,
                Symbol::new(name, kind, location),
            )
            .with_add_ons(add_ons),
        );
    }

    fn type_annotation(&mut self, annotation: &Annotation, type_name: &str) {
        let Some((_, meta)) = STEREOTYPES
            .iter()
            .find(|(name, _)| *name == annotation.name)
        else {
            self.plain_annotation(annotation);
            return;
        };

        let bean_name = self
            .string_attribute(annotation, &["value"])
            .unwrap_or_else(|| decapitalize(type_name));
        let mut label = format!("@+ '{bean_name}' (@{}", annotation.name);
        if !meta.is_empty() {
            let chain: Vec<String> = meta.iter().map(|name| format!("@{name}")).collect();
            label.push_str(" <: ");
            label.push_str(&chain.join(", "));
        }
        label.push_str(") ");
        label.push_str(type_name);

        let bean = AddOn::Bean(BeanInfo {
            name: bean_name,
            bean_type: self.names.resolve(type_name),
        });
        self.push(annotation, label, SymbolKind::Interface, vec![bean]);
    }

    fn method_annotation(
        &mut self,
        annotation: &Annotation,
        method_name: &str,
        return_type: &str,
        class_prefixes: &[String],
    ) {
        if annotation.name == "Bean" {
            let bean_name = self
                .string_attribute(annotation, &["name", "value"])
                .unwrap_or_else(|| method_name.to_string());
            let label = format!("@+ '{bean_name}' (@Bean) {return_type}");
            let bean = AddOn::Bean(BeanInfo {
                name: bean_name,
                bean_type: self.names.resolve(strip_type_arguments(return_type)),
            });
            self.push(annotation, label, SymbolKind::Interface, vec![bean]);
            return;
        }

        let Some((_, fixed_method)) = REQUEST_MAPPINGS
            .iter()
            .find(|(name, _)| *name == annotation.name)
        else {
            self.plain_annotation(annotation);
            return;
        };

        let methods: Vec<String> = match fixed_method {
            Some(method) => vec![method.to_string()],
            None => self.request_methods(annotation),
        };
        let own_paths = match self.paths_of(annotation) {
            None => vec![String::new()],
            // Only constants from other files; nothing to show until they resolve.
            Some(paths) if paths.is_empty() => return,
            Some(paths) => paths,
        };
        let prefixes: Vec<&str> = if class_prefixes.is_empty() {
            vec![""]
        } else {
            class_prefixes.iter().map(String::as_str).collect()
        };

        for prefix in &prefixes {
            for path in &own_paths {
                let path = join_paths(prefix, path);
                let mut label = format!("@{path}");
                if !methods.is_empty() {
                    label.push_str(" -- ");
                    label.push_str(&methods.join(", "));
                }
                let info = AddOn::RequestMapping(RequestMappingInfo {
                    path,
                    methods: methods.clone(),
                });
                self.push(annotation, label, SymbolKind::Method, vec![info]);
            }
        }
    }

    fn plain_annotation(&mut self, annotation: &Annotation) {
        if !PLAIN_ANNOTATIONS.contains(&annotation.name.as_str()) {
            return;
        }
        let label = collapse_whitespace(&annotation.text);
        self.push(annotation, label, SymbolKind::Annotation, Vec::new());
    }

    /// Paths of a mapping annotation, `None` if it declares none. Unresolvable
    /// expressions are dropped.
    fn paths_of(&mut self, annotation: &Annotation) -> Option<Vec<String>> {
        let args = annotation.args.as_deref()?;
        let attrs = attributes(args);
        let expr = attrs
            .iter()
            .find(|(name, _)| name == "value" || name == "path")
            .map(|(_, expr)| expr.as_str())?;
        Some(self.string_values(expr))
    }

    fn request_methods(&self, annotation: &Annotation) -> Vec<String> {
        static METHOD_RE: OnceLock<Regex> = OnceLock::new();
        let re = METHOD_RE.get_or_init(|| {
            Regex::new(r"(?:RequestMethod\.)?\b(GET|HEAD|POST|PUT|PATCH|DELETE|OPTIONS|TRACE)\b")
                .expect("valid regex")
        });
        let Some(args) = annotation.args.as_deref() else {
            return Vec::new();
        };
        attributes(args)
            .into_iter()
            .filter(|(name, _)| name == "method")
            .flat_map(|(_, expr)| {
                re.captures_iter(&expr)
                    .map(|caps| caps[1].to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn string_attribute(&mut self, annotation: &Annotation, keys: &[&str]) -> Option<String> {
        let args = annotation.args.as_deref()?;
        let attrs = attributes(args);
        let expr = keys
            .iter()
            .find_map(|key| attrs.iter().find(|(name, _)| name.as_str() == *key))?
            .1
            .clone();
        self.string_values(&expr).into_iter().next()
    }

    fn string_values(&mut self, expr: &str) -> Vec<String> {
        let expr = expr.trim();
        let items: Vec<String> = match expr.strip_prefix('{').and_then(|e| e.strip_suffix('}')) {
            Some(inner) => split_top_level(inner)
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            None => vec![expr.to_string()],
        };
        items
            .iter()
            .filter_map(|item| self.string_value(item))
            .collect()
    }

    fn string_value(&mut self, expr: &str) -> Option<String> {
        if let Some(literal) = string_literal(expr) {
            return Some(literal);
        }
        // `NAME` or `Owner.NAME`; only constants declared in this file resolve.
        let (owner, name) = match expr.rsplit_once('.') {
            Some((owner, name)) => (Some(owner.trim()), name.trim()),
            None => (None, expr),
        };
        if !is_identifier(name) {
            return None;
        }
        if let Some(owner) = owner {
            if owner.split('.').all(is_identifier) {
                self.dependencies.insert(self.names.resolve(owner));
            }
        }
        self.constants.get(name).cloned()
    }
}

fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    };
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

/// `java.beans.Introspector.decapitalize`: `MainClass` -> `mainClass`, `URLMapper` stays.
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) && first.is_uppercase() {
        return name.to_string();
    }
    let mut out: String = first.to_lowercase().collect();
    out.push_str(&name[first.len_utf8()..]);
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_type_arguments(ty: &str) -> &str {
    ty.split('<').next().unwrap_or(ty).trim()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn string_literal(expr: &str) -> Option<String> {
    let inner = expr.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Some(out)
}

/// Splits at commas outside of literals, parentheses and braces.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// `name = expr` pairs of an annotation argument list; a bare expression is `value`.
fn attributes(args: &str) -> Vec<(String, String)> {
    static NAMED_RE: OnceLock<Regex> = OnceLock::new();
    let re = NAMED_RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*([A-Za-z_$][\w$]*)\s*=([^=].*)$").expect("valid regex")
    });
    split_top_level(args)
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| match re.captures(part) {
            Some(caps) => (caps[1].to_string(), caps[2].trim().to_string()),
            None => ("value".to_string(), part.trim().to_string()),
        })
        .collect()
}

fn string_constants(code: &str) -> BTreeMap<String, String> {
    static CONSTANT_RE: OnceLock<Regex> = OnceLock::new();
    let re = CONSTANT_RE.get_or_init(|| {
        Regex::new(
            r#"\b(?:static\s+final|final\s+static)\s+String\s+([A-Za-z_$][\w$]*)\s*=\s*("(?:\\.|[^"\\])*")\s*;"#,
        )
        .expect("valid regex")
    });
    re.captures_iter(code)
        .filter_map(|caps| Some((caps[1].to_string(), string_literal(&caps[2])?)))
        .collect()
}

/// Qualifies simple type names through explicit imports or the package.
struct NameResolver {
    package: Option<String>,
    imports: BTreeMap<String, String>,
}

impl NameResolver {
    fn new(skeleton: &str) -> Self {
        static PACKAGE_RE: OnceLock<Regex> = OnceLock::new();
        static IMPORT_RE: OnceLock<Regex> = OnceLock::new();
        let package_re = PACKAGE_RE.get_or_init(|| {
            Regex::new(r"(?m)^\s*package\s+([\w$.]+)\s*;").expect("valid regex")
        });
        let import_re = IMPORT_RE.get_or_init(|| {
            Regex::new(r"(?m)^\s*import\s+(static\s+)?([\w$.]+?)(\.\*)?\s*;").expect("valid regex")
        });

        let package = package_re
            .captures(skeleton)
            .map(|caps| caps[1].to_string());
        let imports = import_re
            .captures_iter(skeleton)
            .filter(|caps| caps.get(1).is_none() && caps.get(3).is_none())
            .filter_map(|caps| {
                let fq = caps[2].to_string();
                let simple = fq.rsplit('.').next()?.to_string();
                Some((simple, fq))
            })
            .collect();
        Self { package, imports }
    }

    fn resolve(&self, name: &str) -> String {
        let name = name.trim();
        if name.contains('.') {
            return name.to_string();
        }
        if let Some(fq) = self.imports.get(name) {
            return fq.clone();
        }
        match &self.package {
            Some(package) => format!("{package}.{name}"),
            None => name.to_string(),
        }
    }
}

struct TypeDecl {
    name: String,
    /// Byte offset of the declaration keyword.
    offset: usize,
    supertypes: Vec<String>,
}

fn type_declarations(skeleton: &str) -> Vec<TypeDecl> {
    static TYPE_RE: OnceLock<Regex> = OnceLock::new();
    let re = TYPE_RE.get_or_init(|| {
        Regex::new(r"(?:^|[^.\w$@])(@interface|class|interface|enum|record)\s+([A-Za-z_$][\w$]*)")
            .expect("valid regex")
    });
    re.captures_iter(skeleton)
        .filter_map(|caps| {
            let keyword = caps.get(1)?;
            let name = caps.get(2)?;
            let header_end = skeleton[name.end()..]
                .find(['{', ';'])
                .map_or(skeleton.len(), |i| name.end() + i);
            Some(TypeDecl {
                name: name.as_str().to_string(),
                offset: keyword.start(),
                supertypes: supertypes(&skeleton[name.end()..header_end]),
            })
        })
        .collect()
}

fn supertypes(header: &str) -> Vec<String> {
    let header = strip_nested(&strip_nested(header, '<', '>'), '(', ')');
    let mut out = Vec::new();
    let mut collecting = false;
    for token in header.split(|c: char| c.is_whitespace() || c == ',') {
        match token {
            "" => {}
            "extends" | "implements" => collecting = true,
            "permits" => collecting = false,
            name if collecting && name.split('.').all(is_identifier) => out.push(name.to_string()),
            _ => {}
        }
    }
    out
}

fn strip_nested(text: &str, open: char, close: char) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            out.push(c);
        }
    }
    out
}

struct Annotation {
    /// Simple name, without `@` or qualifier.
    name: String,
    start: usize,
    end: usize,
    /// Argument source between the parentheses, literals intact.
    args: Option<String>,
    /// The full annotation as written.
    text: String,
    range: Range,
}

fn annotations(masked: &Masked, lines: &LineIndex<'_>) -> Result<Vec<Annotation>, ScanError> {
    let skeleton = masked.skeleton.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < skeleton.len() {
        if skeleton[i] != b'@' {
            i += 1;
            continue;
        }
        let start = i;
        let mut name_end = start + 1;
        while name_end < skeleton.len()
            && (skeleton[name_end].is_ascii_alphanumeric()
                || matches!(skeleton[name_end], b'_' | b'$' | b'.'))
        {
            name_end += 1;
        }
        let qualified = &masked.skeleton[start + 1..name_end];
        if qualified.is_empty() || qualified == "interface" {
            i = name_end.max(start + 1);
            continue;
        }

        let mut cursor = name_end;
        while cursor < skeleton.len() && skeleton[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        let (end, args) = if skeleton.get(cursor) == Some(&b'(') {
            let close = matching_paren(skeleton, cursor).ok_or_else(|| {
                ScanError::new(format!(
                    "unterminated arguments of @{qualified} at line {}",
                    lines.position(start).line + 1
                ))
            })?;
            (close + 1, Some(masked.code[cursor + 1..close].to_string()))
        } else {
            (name_end, None)
        };

        out.push(Annotation {
            name: qualified.rsplit('.').next().unwrap_or(qualified).to_string(),
            start,
            end,
            args,
            text: masked.code[start..end].to_string(),
            range: Range::new(lines.position(start), lines.position(end)),
        });
        i = end;
    }
    Ok(out)
}

fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in bytes[open..].iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Clone)]
enum Target {
    Type { name: String, decl_offset: usize },
    Method { name: String, return_type: String },
    Other,
}

/// Resolves what each annotation is attached to. Consecutive annotations share the
/// declaration that follows the last of them.
fn annotation_targets(skeleton: &str, annotations: &[Annotation]) -> Vec<Target> {
    static TYPE_HEADER_RE: OnceLock<Regex> = OnceLock::new();
    static METHOD_HEADER_RE: OnceLock<Regex> = OnceLock::new();
    let type_re = TYPE_HEADER_RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(?:public|protected|private|static|final|abstract|sealed|non-sealed|strictfp)\s+)*(@interface|class|interface|enum|record)\s+([A-Za-z_$][\w$]*)",
        )
        .expect("valid regex")
    });
    let method_re = METHOD_HEADER_RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(?:public|protected|private|static|final|abstract|synchronized|default|native|strictfp)\s+)*(?:<[^>]*>\s*)?([\w$.]+(?:\s*<.*?>)?(?:\s*\[\s*\])*)\s+([A-Za-z_$][\w$]*)\s*\(",
        )
        .expect("valid regex")
    });

    let mut targets = Vec::with_capacity(annotations.len());
    let mut group_start = 0;
    while group_start < annotations.len() {
        let mut group_end = group_start;
        while group_end + 1 < annotations.len()
            && skeleton[annotations[group_end].end..annotations[group_end + 1].start]
                .trim()
                .is_empty()
        {
            group_end += 1;
        }

        let header_start = annotations[group_end].end;
        let header_len = skeleton[header_start..]
            .find(['{', ';', '='])
            .unwrap_or(skeleton.len() - header_start);
        let header = &skeleton[header_start..header_start + header_len];

        let target = if let Some(caps) = type_re.captures(header) {
            Target::Type {
                name: caps[2].to_string(),
                decl_offset: header_start + caps.get(1).map_or(0, |m| m.start()),
            }
        } else {
            match method_re.captures(header) {
                Some(caps) if !METHOD_MODIFIERS.contains(&&caps[1]) => Target::Method {
                    name: caps[2].to_string(),
                    return_type: collapse_whitespace(&caps[1]),
                },
                _ => Target::Other,
            }
        };

        for _ in group_start..=group_end {
            targets.push(target.clone());
        }
        group_start = group_end + 1;
    }
    targets
}

/// Two copies of the source with byte offsets identical to the original: `code` has
/// comments blanked, `skeleton` additionally blanks the contents of literals.
struct Masked {
    code: String,
    skeleton: String,
}

impl Masked {
    fn new(source: &str) -> Self {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Code,
            LineComment,
            BlockComment,
            Literal(char),
            TextBlock,
        }

        fn blank(out: &mut String, c: char) {
            if c == '\n' {
                out.push('\n');
            } else {
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
        }

        let mut code = String::with_capacity(source.len());
        let mut skeleton = String::with_capacity(source.len());
        let mut state = State::Code;
        let mut chars = source.char_indices();
        while let Some((i, c)) = chars.next() {
            let rest = &source[i..];
            match state {
                State::Code => {
                    if rest.starts_with("//") {
                        state = State::LineComment;
                        blank(&mut code, c);
                        blank(&mut skeleton, c);
                    } else if rest.starts_with("/*") {
                        state = State::BlockComment;
                        blank(&mut code, c);
                        blank(&mut skeleton, c);
                        // Consume the `*` so `/*/` does not close the comment.
                        if let Some((_, star)) = chars.next() {
                            blank(&mut code, star);
                            blank(&mut skeleton, star);
                        }
                    } else if rest.starts_with("\"\"\"") {
                        state = State::TextBlock;
                        code.push_str("\"\"\"");
                        skeleton.push_str("\"\"\"");
                        chars.next();
                        chars.next();
                    } else {
                        if c == '"' || c == '\'' {
                            state = State::Literal(c);
                        }
                        code.push(c);
                        skeleton.push(c);
                    }
                }
                State::LineComment => {
                    if c == '\n' {
                        state = State::Code;
                    }
                    blank(&mut code, c);
                    blank(&mut skeleton, c);
                }
                State::BlockComment => {
                    blank(&mut code, c);
                    blank(&mut skeleton, c);
                    if rest.starts_with("*/") {
                        if let Some((_, slash)) = chars.next() {
                            blank(&mut code, slash);
                            blank(&mut skeleton, slash);
                        }
                        state = State::Code;
                    }
                }
                State::Literal(quote) => {
                    if c == '\\' {
                        code.push(c);
                        blank(&mut skeleton, c);
                        if let Some((_, escaped)) = chars.next() {
                            code.push(escaped);
                            blank(&mut skeleton, escaped);
                        }
                    } else if c == quote || c == '\n' {
                        // A newline ends an unterminated literal; keeps one bad line local.
                        state = State::Code;
                        code.push(c);
                        skeleton.push(c);
                    } else {
                        code.push(c);
                        blank(&mut skeleton, c);
                    }
                }
                State::TextBlock => {
                    if rest.starts_with("\"\"\"") {
                        state = State::Code;
                        code.push_str("\"\"\"");
                        skeleton.push_str("\"\"\"");
                        chars.next();
                        chars.next();
                    } else if c == '\\' {
                        code.push(c);
                        blank(&mut skeleton, c);
                        if let Some((_, escaped)) = chars.next() {
                            code.push(escaped);
                            blank(&mut skeleton, escaped);
                        }
                    } else {
                        code.push(c);
                        blank(&mut skeleton, c);
                    }
                }
            }
        }
        Self { code, skeleton }
    }
}

struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, starts }
    }

    fn position(&self, offset: usize) -> Position {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let start = self.starts.get(line).copied().unwrap_or(0);
        let character = self
            .text
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        Position::new(line as u32, character as u32)
    }
}
