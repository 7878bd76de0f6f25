use nom::{
  IResult,
  Parser,
  bytes::take_until,
  bytes::tag,
  multi::many0,
  branch::alt,
  combinator::rest,
  combinator::complete,
  combinator::value,
  combinator::verify,
};

pub const TOPIC_SLOT: &str = "{topic}";

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Topic,
}

/// A template layout split around its `{topic}` slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    segments: Vec<Segment>,
}

impl Layout {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn render(&self, topic: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Topic => out.push_str(topic),
            }
        }
        out
    }

    pub fn has_topic(&self) -> bool {
        self.segments.contains(&Segment::Topic)
    }
}

fn topic_slot(input: &str) -> IResult<&str, Segment> {
    complete(value(Segment::Topic, tag(TOPIC_SLOT))).parse(input)
}

fn literal(input: &str) -> IResult<&str, Segment> {
    let (input, text) = verify(
        alt((complete(take_until(TOPIC_SLOT)), rest)),
        |s: &str| !s.is_empty(),
    )
    .parse(input)?;
    Ok((input, Segment::Literal(text.to_string())))
}

fn layout_body(input: &str) -> IResult<&str, Vec<Segment>> {
    many0(alt((topic_slot, literal))).parse(input)
}

pub fn parse(layout_str: &str) -> Result<Layout, String> {
    match layout_body(layout_str) {
        Ok(("", segments)) => Ok(Layout { segments }),
        Ok((leftover, _)) => Err(format!("unparsed layout tail: {:?}", leftover)),
        Err(e) => Err(format!("Couldn't read layout: {}", e)),
    }
}
