mod break_validation;
mod equality_props;
