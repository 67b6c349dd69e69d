/*!
Command-line SQL fragment parsing

The record commands and charts accept small pieces of SQL as plain
arguments. This module turns those strings into the parts the query
builders need.

## Pieces

1. **Expression lists**: `split_expressions` cuts `a, f(b, c) AS d` at
   top-level commas, and `parse_field_with_alias` peels off `AS d`.

2. **Aggregations**: `parse_aggregation` recognizes `avg(field)` style value
   fields so chart queries can aggregate inside the engine.

## Example Usage

```rust
use tabplot::parser::{parse_aggregation, split_expressions, AggregateFunction};

let fields = split_expressions("region, sum(sales) AS total");
assert_eq!(fields, vec!["region", "sum(sales) AS total"]);

let spec = parse_aggregation("avg(latency)");
assert_eq!(spec.function, Some(AggregateFunction::Avg));
assert_eq!(spec.to_sql(), "AVG(latency)");
```
*/

pub mod aggregate;
pub mod splitter;

pub use aggregate::{parse_aggregation, value_expression, AggregateFunction, AggregationSpec};
pub use splitter::{parse_field_with_alias, split_expressions};
