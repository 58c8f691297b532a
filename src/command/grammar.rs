//! Surface grammar of archive commands.
//!
//! ```text
//! command  := ws "!" identifier (ws argument)* ws EOF
//! argument := binding | item
//! binding  := identifier ":" item (ws item)*      -- items stop at the next binding
//! item     := ("+" | "-") item | list | quoted | bare
//! list     := "[" (item ("," item)*)? "]"
//! quoted   := '"' (char | '\"' | '\\')* '"'
//! bare     := one or more chars other than whitespace, '[', ']', ',' and '"'
//! ```
//!
//! Lists and delta markers nest at most [`MAX_NESTING`] levels deep.
//!
//! A bare token made only of ASCII digits is a number. A binding key must be
//! followed right after its colon by whitespace, end of input, `[`, `"`, `+`
//! or `-`; anything else (`lang:rust`, `https://...`) stays a bare token.

use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, one_of, satisfy},
    combinator::{all_consuming, cut, eof, map, not, peek, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use super::error::SyntaxError;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Deepest allowed stack of `[` and `+`/`-` around one item.
pub const MAX_NESTING: usize = 32;

/// Generic parse tree node. Slices borrow from the command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    Word(&'a str),
    /// Content between the quotes, escapes still in place.
    Quoted(&'a str),
    Number(&'a str),
    List(Vec<Node<'a>>),
    Add(Box<Node<'a>>),
    Sub(Box<Node<'a>>),
}

/// Top-level element of a command body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg<'a> {
    Item(Node<'a>),
    Binding(&'a str, Vec<Node<'a>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree<'a> {
    pub name: &'a str,
    pub body: Vec<Arg<'a>>,
}

/// Parse one command line.
pub fn parse(input: &str) -> Result<ParseTree<'_>, SyntaxError> {
    match all_consuming(terminated(command, multispace0))(input) {
        Ok((_, tree)) => Ok(tree),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(to_syntax_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError::new(
            input,
            input.len(),
            "unexpected end of input",
        )),
    }
}

fn command(i: &str) -> Res<'_, ParseTree<'_>> {
    let (i, _) = multispace0(i)?;
    let (i, _) = context("command marker '!'", char('!'))(i)?;
    let (i, name) = cut(context("command name", identifier))(i)?;
    let (i, body) = many0(preceded(multispace0, argument))(i)?;
    Ok((i, ParseTree { name, body }))
}

fn argument(i: &str) -> Res<'_, Arg<'_>> {
    alt((
        map(
            pair(
                binding_key,
                cut(context(
                    "value after binding",
                    many1(preceded(
                        multispace0,
                        preceded(not(binding_key), |i| item(i, 0)),
                    )),
                )),
            ),
            |(key, items)| Arg::Binding(key, items),
        ),
        map(|i| item(i, 0), Arg::Item),
    ))(i)
}

fn binding_key(i: &str) -> Res<'_, &str> {
    terminated(
        identifier,
        pair(
            char(':'),
            peek(alt((
                value((), multispace1),
                value((), eof),
                value((), one_of("[\"+-")),
            ))),
        ),
    )(i)
}

fn identifier(i: &str) -> Res<'_, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(i)
}

fn item(i: &str, depth: usize) -> Res<'_, Node<'_>> {
    if depth > MAX_NESTING {
        return Err(nom::Err::Failure(VerboseError {
            errors: vec![(i, VerboseErrorKind::Context("at most 32 levels of nesting"))],
        }));
    }
    alt((|i| delta(i, depth), |i| list(i, depth), quoted, bare))(i)
}

fn delta(i: &str, depth: usize) -> Res<'_, Node<'_>> {
    let (i, sign) = one_of("+-")(i)?;
    let (i, inner) = cut(context("item after delta marker", |i| item(i, depth + 1)))(i)?;
    let node = match sign {
        '+' => Node::Add(Box::new(inner)),
        _ => Node::Sub(Box::new(inner)),
    };
    Ok((i, node))
}

fn list(i: &str, depth: usize) -> Res<'_, Node<'_>> {
    map(
        preceded(
            char('['),
            cut(context(
                "closing ']'",
                terminated(
                    separated_list0(
                        preceded(multispace0, char(',')),
                        preceded(multispace0, |i| item(i, depth + 1)),
                    ),
                    preceded(multispace0, char(']')),
                ),
            )),
        ),
        Node::List,
    )(i)
}

fn quoted(i: &str) -> Res<'_, Node<'_>> {
    let body = recognize(many0(alt((
        is_not("\\\""),
        recognize(pair(char('\\'), one_of("\\\""))),
    ))));
    map(
        delimited(char('"'), body, cut(context("closing quote", char('"')))),
        Node::Quoted,
    )(i)
}

fn bare(i: &str) -> Res<'_, Node<'_>> {
    map(take_while1(is_bare_char), |token: &str| {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            Node::Number(token)
        } else {
            Node::Word(token)
        }
    })(i)
}

fn is_bare_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '[' | ']' | ',' | '"')
}

/// Report the innermost failure, labelled by the nearest context.
fn to_syntax_error(input: &str, e: VerboseError<&str>) -> SyntaxError {
    let Some((rest, _)) = e.errors.first() else {
        return SyntaxError::new(input, 0, "invalid command");
    };
    let position = input.len() - rest.len();

    let message = e
        .errors
        .iter()
        .find_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(ctx) => Some(format!("expected {ctx}")),
            _ => None,
        })
        .or_else(|| {
            e.errors.iter().find_map(|(_, kind)| match kind {
                VerboseErrorKind::Char(c) => Some(format!("expected '{c}'")),
                _ => None,
            })
        })
        .unwrap_or_else(|| "unexpected input".to_string());

    SyntaxError::new(input, position, message)
}
