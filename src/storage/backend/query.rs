//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use sea_orm::sea_query::{Alias, Expr, ExprTrait, Query, SelectStatement};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select,
};
use tracing::debug;

use super::converters::model_to_record;
use super::{PageRequest, SeaOrmStorage, TimestampRange, retry};
use crate::errors::{GeotrailError, Result};
use crate::storage::GeolocationRecord;

use migration::entities::geolocation;

fn in_range(range: &TimestampRange) -> Condition {
    Condition::all()
        .add(geolocation::Column::Timestamp.gte(range.start))
        .add(geolocation::Column::Timestamp.lt(range.end))
}

/// `page` 为 None 时不分页；偏移量溢出时报错而不是截断
fn paged(
    query: Select<geolocation::Entity>,
    page: Option<PageRequest>,
) -> Result<Select<geolocation::Entity>> {
    let Some(page) = page else {
        return Ok(query);
    };
    let offset = page.offset().ok_or_else(|| {
        GeotrailError::store(format!(
            "分页偏移量超出范围: page={}, size={}",
            page.page, page.size
        ))
    })?;
    Ok(query.limit(page.size).offset(offset))
}

/// 同一 IP 是否存在更新的记录（时间相同按 id 决胜）
fn newer_record_exists() -> SelectStatement {
    use geolocation::{Column, Entity};

    let newer = Alias::new("newer");
    Query::select()
        .column((newer.clone(), Column::Id))
        .from_as(Entity, newer.clone())
        .and_where(Expr::col((newer.clone(), Column::Ip)).equals((Entity, Column::Ip)))
        .and_where(
            Expr::col((newer.clone(), Column::Timestamp))
                .gt(Expr::col((Entity, Column::Timestamp)))
                .or(Expr::col((newer.clone(), Column::Timestamp))
                    .equals((Entity, Column::Timestamp))
                    .and(Expr::col((newer, Column::Id)).gt(Expr::col((Entity, Column::Id))))),
        )
        .to_owned()
}

impl SeaOrmStorage {
    /// 某个 IP 的全部记录，按时间升序（即写入顺序）
    pub async fn find_by_ip(&self, ip: &str) -> Result<Vec<GeolocationRecord>> {
        let db = &self.db;

        let models = retry::with_retry(
            &format!("find_by_ip({})", ip),
            self.retry_policy,
            || async {
                geolocation::Entity::find()
                    .filter(geolocation::Column::Ip.eq(ip))
                    .order_by_asc(geolocation::Column::Timestamp)
                    .all(db)
                    .await
            },
        )
        .await
        .map_err(|e| GeotrailError::store(format!("查询 IP 历史失败 ({}): {}", ip, e)))?;

        Ok(models.into_iter().map(model_to_record).collect())
    }

    /// 某个 IP 在时间区间内的记录，按时间升序
    pub async fn find_by_ip_and_timestamp_between(
        &self,
        ip: &str,
        range: &TimestampRange,
    ) -> Result<Vec<GeolocationRecord>> {
        let db = &self.db;
        let condition = in_range(range).add(geolocation::Column::Ip.eq(ip));

        let models = retry::with_retry(
            &format!("find_by_ip_and_timestamp_between({})", ip),
            self.retry_policy,
            || async {
                geolocation::Entity::find()
                    .filter(condition.clone())
                    .order_by_asc(geolocation::Column::Timestamp)
                    .all(db)
                    .await
            },
        )
        .await
        .map_err(|e| GeotrailError::store(format!("按时间范围查询 IP 历史失败 ({}): {}", ip, e)))?;

        Ok(models.into_iter().map(model_to_record).collect())
    }

    /// 所有 IP 在时间区间内的记录，按时间降序；`page` 为 None 时不分页
    pub async fn find_by_timestamp_between(
        &self,
        range: &TimestampRange,
        page: Option<PageRequest>,
    ) -> Result<Vec<GeolocationRecord>> {
        let db = &self.db;
        let query = paged(
            geolocation::Entity::find()
                .filter(in_range(range))
                .order_by_desc(geolocation::Column::Timestamp),
            page,
        )?;

        let models = retry::with_retry(
            "find_by_timestamp_between",
            self.retry_policy,
            || query.clone().all(db),
        )
        .await
        .map_err(|e| GeotrailError::store(format!("按时间范围查询历史失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_record).collect())
    }

    /// 库中出现过的所有不同 IP
    pub async fn distinct_ips(&self) -> Result<Vec<String>> {
        let db = &self.db;

        retry::with_retry("distinct_ips", self.retry_policy, || async {
            geolocation::Entity::find()
                .select_only()
                .column(geolocation::Column::Ip)
                .distinct()
                .into_tuple::<String>()
                .all(db)
                .await
        })
        .await
        .map_err(|e| GeotrailError::store(format!("查询 IP 列表失败: {}", e)))
    }

    /// 每个 IP 的最新一条记录，按时间降序
    ///
    /// 去重和分页都在数据库中完成；`page` 为 None 时返回全部
    pub async fn find_latest_per_ip(
        &self,
        page: Option<PageRequest>,
    ) -> Result<Vec<GeolocationRecord>> {
        let db = &self.db;
        let query = paged(
            geolocation::Entity::find()
                .filter(Expr::not_exists(newer_record_exists()))
                .order_by_desc(geolocation::Column::Timestamp)
                .order_by_desc(geolocation::Column::Id),
            page,
        )?;

        let models = retry::with_retry("find_latest_per_ip", self.retry_policy, || {
            query.clone().all(db)
        })
        .await
        .map_err(|e| GeotrailError::store(format!("查询最新记录失败: {}", e)))?;

        debug!("Latest records page holds {} IPs", models.len());

        Ok(models.into_iter().map(model_to_record).collect())
    }

    /// 记录总数（健康检查用）
    pub async fn count(&self) -> Result<u64> {
        let db = &self.db;

        retry::with_retry("count", self.retry_policy, || async {
            geolocation::Entity::find().count(db).await
        })
        .await
        .map_err(|e| GeotrailError::store(format!("统计记录数失败: {}", e)))
    }
}
