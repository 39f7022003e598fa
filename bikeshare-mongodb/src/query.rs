//! Translation of query expressions and pipelines into MongoDB syntax.

use bson::{Document, Bson, doc};

use bikeshare_core::{
    pipeline::{GeoNear, Pipeline, Stage},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        let inner = self.visit_expr(expr)?;

        Ok(doc! {
            "$nor": [inner],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::AnyOf => match value {
                    Bson::Array(_) => doc! { "$in": value },
                    _ => return Err(DocumentStoreError::Backend("AnyOf operator requires an array value".to_string())),
                },
                FieldOp::NoneOf => match value {
                    Bson::Array(_) => doc! { "$nin": value },
                    _ => return Err(DocumentStoreError::Backend("NoneOf operator requires an array value".to_string())),
                },
            }
        })
    }
}

pub(crate) fn sort_document(sort: &Sort) -> Document {
    doc! {
        sort.field.clone(): match sort.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Builds the `$geoNear` stage body.
///
/// The stage's own `limit` option is no longer accepted by the server, so a bounded
/// search is returned as `$geoNear` followed by `$limit`.
fn geo_near_stages(stage: &GeoNear) -> Vec<Document> {
    let coordinates = stage.near.coordinates().to_vec();

    let mut geo_near = doc! {
        "near": {
            "type": "Point",
            "coordinates": coordinates,
        },
        "spherical": stage.spherical,
        "distanceField": stage.distance_field.as_str(),
    };

    if let Some(key) = &stage.key {
        geo_near.insert("key", key.as_str());
    }

    if let Some(max_distance) = stage.max_distance {
        geo_near.insert("maxDistance", max_distance);
    }

    let mut stages = vec![doc! { "$geoNear": geo_near }];

    if let Some(limit) = stage.limit {
        stages.push(limit_stage(limit));
    }

    stages
}

fn limit_stage(limit: usize) -> Document {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    doc! { "$limit": limit }
}

/// Translates a pipeline into the stage documents sent to `aggregate`.
pub(crate) fn translate_pipeline(pipeline: &Pipeline) -> DocumentStoreResult<Vec<Document>> {
    let mut stages = Vec::with_capacity(pipeline.stages.len());

    for stage in &pipeline.stages {
        match stage {
            Stage::Match(expr) => {
                let filter = MongoQueryTranslator.visit_expr(expr)?;
                stages.push(doc! { "$match": filter });
            }
            Stage::GeoNear(geo_near) => stages.extend(geo_near_stages(geo_near)),
            Stage::Sort(sort) => stages.push(doc! { "$sort": sort_document(sort) }),
            Stage::Limit(limit) => stages.push(limit_stage(*limit)),
        }
    }

    Ok(stages)
}
