//! Plan construction from player script source
//!
//! Two plans are recovered from a script: the signature plan (an ordered
//! list of transform calls plus a name → operation map) and the throttling
//! program (an operand array plus an ordered list of indexed call steps).
//! Building either fails closed: a caller gets a complete plan or an error.

use crate::error::CipherError;
use crate::js::classify::{CanonicalOperation, OperationClassifier};
use crate::js::patterns::ScriptPatterns;
use crate::js::scanner::{find_closing_bracket, literal_at, split_top_level_commas, Match, Span};
use crate::js::tokenizer::split_top_level;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Marker preceding the operand array inside the throttling function
const OPERAND_ARRAY_MARKER: &str = ",c=[";

/// Operand value that stands for the caller's input sequence
pub const INPUT_PLACEHOLDER: &str = "b";

/// Obfuscated transform name → operation
pub type TransformMap = HashMap<String, CanonicalOperation>;

/// Ordered transform call statements, verbatim from the entry function body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformPlan {
    pub statements: Vec<String>,
}

impl TransformPlan {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Everything needed to decipher a signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePlan {
    pub transforms: TransformPlan,
    pub map: TransformMap,
}

/// One element of the throttling operand array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandToken {
    Integer(i64),
    Text(String),
    Operation(CanonicalOperation),
    /// The operand array itself (a `null` slot in the source)
    SelfArray,
}

/// A single call `c[operation](c[first], c[second]?)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlingStep {
    pub operation: usize,
    pub first: usize,
    pub second: Option<usize>,
}

/// Ordered throttling calls, in execution order
pub type ThrottlingPlan = Vec<ThrottlingStep>;

/// Everything needed to transform a throttling parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlingProgram {
    pub plan: ThrottlingPlan,
    pub operands: Vec<OperandToken>,
}

/// Builds plans from script text using the compiled pattern catalogue
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    patterns: ScriptPatterns,
    classifier: OperationClassifier,
}

impl PlanBuilder {
    /// Create a new plan builder
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: ScriptPatterns::new()?,
            classifier: OperationClassifier::new()?,
        })
    }

    /// Recover the signature transform plan and map from `js`
    pub fn build_signature_plan(&self, js: &str) -> Result<SignaturePlan> {
        let name = self.patterns.signature_function.first_match(js)?;
        debug!("Signature function: {}", name.as_str());

        let (_, body) = function_source(js, name.as_str())?;
        let inner = strip_delimiters(body.as_str());
        let statements: Vec<&str> = inner
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if statements.len() < 3 {
            return Err(CipherError::ExtractionFailed(format!(
                "signature function {} has {} statements, expected at least 3",
                name.as_str(),
                statements.len()
            )));
        }
        let calls = &statements[1..statements.len() - 1];

        let object = self.patterns.transform_object.first_match(calls[0])?;
        debug!("Transform object: {}", object.as_str());

        let literal = object_literal(js, object.as_str())?;
        let map = self.transform_map(strip_delimiters(literal.as_str()))?;

        let transforms = TransformPlan {
            statements: calls.iter().map(|s| s.to_string()).collect(),
        };
        debug!(
            "Built signature plan: {} statements, {} transforms",
            transforms.len(),
            map.len()
        );

        Ok(SignaturePlan { transforms, map })
    }

    /// Classify each `name:function(..){..}` entry of a transform object body
    fn transform_map(&self, object_body: &str) -> Result<TransformMap> {
        let normalized = object_body.replace(['\n', '\r'], " ");
        let mut map = TransformMap::new();

        for entry in split_top_level_commas(&normalized) {
            let Some((name, source)) = entry.split_once(':') else {
                warn!("Skipping transform entry without name: {}", entry);
                continue;
            };
            let name = name.trim().trim_matches(|c| c == '"' || c == '\'');
            match self.classifier.classify(source) {
                Some(op) => {
                    map.insert(name.to_string(), op);
                }
                None => warn!("Unrecognised transform {}: {}", name, source.trim()),
            }
        }

        if map.is_empty() {
            return Err(CipherError::ExtractionFailed(
                "transform object has no recognised operations".to_string(),
            ));
        }
        Ok(map)
    }

    /// Recover the throttling program (operand array and call plan) from `js`
    pub fn build_throttling_plan(&self, js: &str) -> Result<ThrottlingProgram> {
        let name = self.throttling_function_name(js)?;
        debug!("Throttling function: {}", name);

        let (definition, _) = function_source(js, &name)?;
        let source: String = definition
            .as_str()
            .chars()
            .filter(|&c| c != '\n' && c != '\r')
            .collect();

        let marker = source.find(OPERAND_ARRAY_MARKER).ok_or_else(|| {
            CipherError::ExtractionFailed(format!(
                "throttling function {} has no operand array",
                name
            ))
        })?;
        let array = find_closing_bracket(&source, marker + OPERAND_ARRAY_MARKER.len() - 1)?;
        let operands = split_top_level(array.slice(&source))?
            .into_iter()
            .map(|raw| self.operand_token(raw))
            .collect::<Vec<_>>();

        let after_array = &source[array.end..];
        let open = self.patterns.try_block.first_match(after_array)?;
        let block = find_closing_bracket(after_array, open.start())?;
        let plan = self.throttling_steps(block.slice(after_array), operands.len())?;

        debug!(
            "Built throttling program: {} operands, {} steps",
            operands.len(),
            plan.len()
        );
        Ok(ThrottlingProgram { plan, operands })
    }

    /// Name of the throttling entry function, resolved through its holder array if needed
    pub fn throttling_function_name(&self, js: &str) -> Result<String> {
        match self.patterns.throttling_function.first_match(js) {
            Ok(name) if has_definition(js, name.as_str())? => {
                return Ok(name.as_str().to_string())
            }
            Ok(name) => debug!(
                "Throttling candidate {} has no definition, trying holder array",
                name.as_str()
            ),
            Err(CipherError::NoPatternMatched(_)) => {}
            Err(e) => return Err(e),
        }

        let array = self.patterns.throttling_array_ref.first_match(js)?;
        let index: usize = self
            .patterns
            .index_suffix
            .captures(&js[array.end()..])
            .and_then(|caps| caps.name("index"))
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| {
                CipherError::ExtractionFailed(format!(
                    "no index after throttling array {}",
                    array.as_str()
                ))
            })?;

        let open = ScriptPatterns::array_literal(array.as_str())?.first_match(js)?;
        let literal = literal_at(js, open.start())?;
        let elements = split_top_level(literal.as_str())?;
        let name = elements.get(index).ok_or_else(|| {
            CipherError::ExtractionFailed(format!(
                "throttling array {} has no element {}",
                array.as_str(),
                index
            ))
        })?;
        debug!("Resolved {}[{}] to {}", array.as_str(), index, name);
        Ok(name.to_string())
    }

    fn operand_token(&self, raw: &str) -> OperandToken {
        let token = raw.trim();
        if let Ok(value) = token.parse::<i64>() {
            return OperandToken::Integer(value);
        }
        if token == "null" {
            return OperandToken::SelfArray;
        }
        for quote in ['"', '\''] {
            if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
                return OperandToken::Text(token[1..token.len() - 1].to_string());
            }
        }
        if token.starts_with("function") {
            if let Some(op) = self.classifier.classify(token) {
                return OperandToken::Operation(op);
            }
        }
        OperandToken::Text(token.to_string())
    }

    fn throttling_steps(&self, block: &str, operand_count: usize) -> Result<ThrottlingPlan> {
        let parse = |text: &str| -> Result<usize> {
            let index = text
                .parse::<usize>()
                .map_err(|e| CipherError::ExtractionFailed(format!("bad operand index: {}", e)))?;
            if index < operand_count {
                Ok(index)
            } else {
                Err(CipherError::ExtractionFailed(format!(
                    "throttling step references operand {} of {}",
                    index, operand_count
                )))
            }
        };

        let mut plan = ThrottlingPlan::new();
        for caps in self.patterns.throttling_step.captures_iter(block) {
            plan.push(ThrottlingStep {
                operation: parse(&caps["op"])?,
                first: parse(&caps["first"])?,
                second: caps.name("second").map(|m| parse(m.as_str())).transpose()?,
            });
        }

        if plan.is_empty() {
            return Err(CipherError::ExtractionFailed(
                "throttling try block has no call steps".to_string(),
            ));
        }
        Ok(plan)
    }
}

/// Locate the definition of `name`, returning the whole definition and its body
fn function_source<'a>(js: &'a str, name: &str) -> Result<(Match<'a>, Match<'a>)> {
    let def = ScriptPatterns::function_definition(name)?.first_match(js)?;
    let body = find_closing_bracket(js, def.end() - 1)?;
    Ok((
        Match::new(js, Span::new(def.start(), body.end)),
        Match::new(js, body),
    ))
}

fn has_definition(js: &str, name: &str) -> Result<bool> {
    Ok(ScriptPatterns::function_definition(name)?
        .first_match(js)
        .is_ok())
}

fn object_literal<'a>(js: &'a str, name: &str) -> Result<Match<'a>> {
    let open = ScriptPatterns::object_literal(name)?.first_match(js)?;
    literal_at(js, open.start())
}

/// Drop the outer bracket pair of a literal
fn strip_delimiters(literal: &str) -> &str {
    if literal.len() >= 2 {
        &literal[1..literal.len() - 1]
    } else {
        ""
    }
}

/// Build the signature plan with a freshly compiled catalogue
pub fn build_signature_plan(js: &str) -> Result<SignaturePlan> {
    PlanBuilder::new()?.build_signature_plan(js)
}

/// Build the throttling program with a freshly compiled catalogue
pub fn build_throttling_plan(js: &str) -> Result<ThrottlingProgram> {
    PlanBuilder::new()?.build_throttling_plan(js)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fixtures::{INDIRECT_PLAYER_JS, PLAYER_JS};

    #[test]
    fn test_build_signature_plan() {
        let plan = build_signature_plan(PLAYER_JS).unwrap();
        assert_eq!(
            plan.transforms.statements,
            vec!["DE.kT(a,2)", "DE.AJ(a,54)", "DE.VR(a,1)", "DE.kT(a,31)"]
        );
        assert_eq!(plan.map.len(), 3);
        assert_eq!(plan.map["AJ"], CanonicalOperation::Reverse);
        assert_eq!(plan.map["VR"], CanonicalOperation::Splice);
        assert_eq!(plan.map["kT"], CanonicalOperation::Swap);
    }

    #[test]
    fn test_build_signature_plan_missing_function() {
        let err = build_signature_plan("var x=1;").unwrap_err();
        assert!(matches!(err, CipherError::NoPatternMatched(_)));
        assert!(err.is_stale_script());
    }

    #[test]
    fn test_build_signature_plan_missing_object() {
        let js = r#"c&&a.set(b,encodeURIComponent(Mka(c)));
Mka=function(a){a=a.split("");ZZ.kT(a,2);return a.join("")};"#;
        assert!(matches!(
            build_signature_plan(js),
            Err(CipherError::NoPatternMatched("transform object literal"))
        ));
    }

    #[test]
    fn test_build_signature_plan_short_body() {
        let js = r#"c&&a.set(b,encodeURIComponent(Mka(c)));
Mka=function(a){return a};"#;
        assert!(matches!(
            build_signature_plan(js),
            Err(CipherError::ExtractionFailed(_))
        ));
    }

    #[test]
    fn test_transform_map_skips_unknown_entries() {
        let builder = PlanBuilder::new().unwrap();
        let map = builder
            .transform_map("AJ:function(a){a.reverse()},\n\"zz\":function(a){a.sort()},\nVR:function(a,b){a.splice(0,b)}")
            .unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key("zz"));

        assert!(matches!(
            builder.transform_map("zz:function(a){a.sort()}"),
            Err(CipherError::ExtractionFailed(_))
        ));
    }

    #[test]
    fn test_build_throttling_plan() {
        let program = build_throttling_plan(PLAYER_JS).unwrap();
        assert_eq!(program.operands.len(), 14);
        assert_eq!(program.operands[0], OperandToken::Integer(-1186681367));
        assert_eq!(
            program.operands[1],
            OperandToken::Operation(CanonicalOperation::Splice)
        );
        assert_eq!(program.operands[2], OperandToken::Text("ab,c".to_string()));
        assert_eq!(program.operands[3], OperandToken::SelfArray);
        assert_eq!(
            program.operands[4],
            OperandToken::Operation(CanonicalOperation::Reverse)
        );
        assert_eq!(
            program.operands[5],
            OperandToken::Text(INPUT_PLACEHOLDER.to_string())
        );
        assert_eq!(
            program.operands[13],
            OperandToken::Operation(CanonicalOperation::Prepend)
        );

        assert_eq!(program.plan.len(), 9);
        assert_eq!(
            program.plan[0],
            ThrottlingStep {
                operation: 4,
                first: 5,
                second: None
            }
        );
        assert_eq!(
            program.plan[1],
            ThrottlingStep {
                operation: 7,
                first: 5,
                second: Some(8)
            }
        );
    }

    #[test]
    fn test_throttling_name_through_array() {
        let builder = PlanBuilder::new().unwrap();
        assert_eq!(builder.throttling_function_name(INDIRECT_PLAYER_JS).unwrap(), "iha");
        let program = builder.build_throttling_plan(INDIRECT_PLAYER_JS).unwrap();
        assert_eq!(program.plan.len(), 9);
    }

    #[test]
    fn test_throttling_name_ignores_later_alternation() {
        // An unrelated `||` further along the same line must not be taken as the entry name
        let js = INDIRECT_PLAYER_JS.replace(
            r#"a.set("n",b))};"#,
            r#"a.set("n",b))};g.Zz=function(a,b){return a||b};"#,
        );
        let builder = PlanBuilder::new().unwrap();
        assert_eq!(builder.throttling_function_name(&js).unwrap(), "iha");
        assert_eq!(builder.build_throttling_plan(&js).unwrap().plan.len(), 9);
    }

    #[test]
    fn test_throttling_name_without_definition_uses_array() {
        let js = INDIRECT_PLAYER_JS.replace(
            r#"a.set("n",b))"#,
            r#"a.set("n",b),Bpa.length||nope(""))"#,
        );
        let builder = PlanBuilder::new().unwrap();
        assert_eq!(builder.throttling_function_name(&js).unwrap(), "iha");
    }

    #[test]
    fn test_throttling_name_missing() {
        let builder = PlanBuilder::new().unwrap();
        assert!(matches!(
            builder.throttling_function_name("var a=1;"),
            Err(CipherError::NoPatternMatched("throttling function array"))
        ));
    }

    #[test]
    fn test_operand_tokens() {
        let builder = PlanBuilder::new().unwrap();
        assert_eq!(builder.operand_token(" 42 "), OperandToken::Integer(42));
        assert_eq!(builder.operand_token("null"), OperandToken::SelfArray);
        assert_eq!(builder.operand_token("\"\""), OperandToken::Text(String::new()));
        assert_eq!(builder.operand_token("'xy'"), OperandToken::Text("xy".to_string()));
        assert_eq!(builder.operand_token("'"), OperandToken::Text("'".to_string()));
        assert_eq!(builder.operand_token("b"), OperandToken::Text("b".to_string()));
        assert_eq!(
            builder.operand_token("function(d,e){return d}"),
            OperandToken::Text("function(d,e){return d}".to_string())
        );
    }

    #[test]
    fn test_throttling_step_out_of_range() {
        let builder = PlanBuilder::new().unwrap();
        assert!(matches!(
            builder.throttling_steps("{c[1](c[9])}", 3),
            Err(CipherError::ExtractionFailed(_))
        ));
        assert!(matches!(
            builder.throttling_steps("{return}", 3),
            Err(CipherError::ExtractionFailed(_))
        ));
    }
}
