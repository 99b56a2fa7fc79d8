use binding::Binding;
use error::SyntaxResult;
use lex::Lexer;
use option::normalize_options;
use parse::Parser;

pub mod ast;
pub mod binding;
pub mod char;
pub mod error;
pub mod lex;
pub mod loc;
pub mod operator;
pub mod option;
pub mod parse;
pub mod scope;
pub mod token;

/// Which form the source text takes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParseMode {
  /// `name(args…)` or `with(imports…) expr`, with optional type and capture suffixes.
  Statement,
  /// A bare expression spanning the whole input.
  Expression,
  /// An expression that may be followed by unrelated text.
  Embedded,
  /// Template contents running to the end of input.
  Template,
  /// Template contents running to the first unescaped occurrence of the given character.
  TemplateTail(char),
}

#[derive(Debug)]
pub struct Parsed {
  pub binding: Binding,
  /// Byte offset at which parsing stopped.
  pub end: usize,
}

pub fn parse(source: &str, mode: ParseMode) -> SyntaxResult<Parsed> {
  let lexer = Lexer::new(source);
  let mut parser = Parser::new(lexer);
  let top = parser.parse_top_level(mode)?;
  let Parser {
    resolver, callbacks, ..
  } = parser;
  resolver.check_imports()?;
  let scopes = resolver.finish();
  let options = normalize_options(&scopes.globals, &scopes.global_order)?;
  let binding = Binding::new(
    source,
    top.root,
    callbacks,
    scopes,
    options,
    top.is_void,
    top.result_type,
  );
  Ok(Parsed {
    binding,
    end: top.end,
  })
}
