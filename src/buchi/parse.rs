//! Just enough parsing to read back the rendered form of an [`Automaton`].
//!
//! The renderer is the source of truth; this recovers the initial set, the
//! accepting sets, and the transition list from its output. The per-state
//! formula sets are not part of the rendering and cannot be recovered.
//!
//! [`Automaton`]: super::Automaton

use std::collections::{BTreeMap, BTreeSet};

use anyhow::anyhow;
use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::map_res,
    multi::{many0, separated_list0},
    sequence::{delimited, preceded, terminated, tuple},
    Finish, IResult,
};

use super::StateLabel;

/// The structural content of a rendered automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAutomaton {
    pub initial: BTreeSet<StateLabel>,
    pub finals: BTreeMap<usize, BTreeSet<StateLabel>>,
    pub transitions: Vec<(StateLabel, BTreeSet<String>, StateLabel)>,
}

/// Parse the `S0 = {…}` / `F<i> = {…}` / `T = {…}` rendering produced by
/// the automaton's `Display` impl.
pub fn parse_automaton(input: &str) -> anyhow::Result<ParsedAutomaton> {
    let (rest, parsed) = parse_all(input.trim())
        .finish()
        .map_err(|e| anyhow!("malformed automaton rendering: {e}"))?;
    if !rest.is_empty() {
        return Err(anyhow!("trailing input after automaton rendering: {rest:?}"));
    }
    Ok(parsed)
}

fn parse_all(input: &str) -> IResult<&str, ParsedAutomaton> {
    let (input, initial) =
        preceded(tag("S0 = "), terminated(parse_label_set, multispace0))(input)?;
    let (input, finals) = many0(parse_final)(input)?;
    let (input, transitions) = parse_transition_block(input)?;
    Ok((
        input,
        ParsedAutomaton {
            initial,
            finals: finals.into_iter().collect(),
            transitions,
        },
    ))
}

fn parse_label(input: &str) -> IResult<&str, StateLabel> {
    map_res(preceded(char('s'), digit1), |n: &str| {
        n.parse::<u32>().map(StateLabel::from)
    })(input)
}

fn parse_label_set(input: &str) -> IResult<&str, BTreeSet<StateLabel>> {
    let (rest, labels) = delimited(
        char('{'),
        separated_list0(tag(", "), parse_label),
        char('}'),
    )(input)?;
    Ok((rest, labels.into_iter().collect()))
}

fn parse_final(input: &str) -> IResult<&str, (usize, BTreeSet<StateLabel>)> {
    tuple((
        map_res(preceded(char('F'), digit1), |n: &str| n.parse::<usize>()),
        preceded(tag(" = "), terminated(parse_label_set, multispace0)),
    ))(input)
}

fn parse_symbol_set(input: &str) -> IResult<&str, BTreeSet<String>> {
    let (rest, symbols) = delimited(
        char('['),
        separated_list0(
            tag(", "),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        ),
        char(']'),
    )(input)?;
    Ok((rest, symbols.into_iter().map(str::to_string).collect()))
}

fn parse_transition(input: &str) -> IResult<&str, (StateLabel, BTreeSet<String>, StateLabel)> {
    tuple((
        parse_label,
        preceded(tag(" --"), parse_symbol_set),
        preceded(tag("--> "), parse_label),
    ))(input)
}

fn parse_transition_block(
    input: &str,
) -> IResult<&str, Vec<(StateLabel, BTreeSet<String>, StateLabel)>> {
    delimited(
        terminated(tag("T = {"), multispace0),
        many0(terminated(parse_transition, multispace0)),
        char('}'),
    )(input)
}
